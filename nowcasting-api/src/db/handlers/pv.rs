//! Database repository for PV systems and their yields.

use sqlx::PgConnection;
use tracing::instrument;

use crate::db::{
    errors::Result,
    models::pv::{PvSystemCreateDBRequest, PvSystemDBResponse, PvYieldCreateDBRequest, PvYieldDBResponse},
};

pub struct PvYields<'c> {
    db: &'c mut PgConnection,
}

impl<'c> PvYields<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(pv_system_id = request.pv_system_id), err)]
    pub async fn create_system(&mut self, request: &PvSystemCreateDBRequest) -> Result<PvSystemDBResponse> {
        let system = sqlx::query_as::<_, PvSystemDBResponse>(
            r#"
            INSERT INTO pv_system (pv_system_id, provider, latitude, longitude, installed_capacity_kw)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(request.pv_system_id)
        .bind(&request.provider)
        .bind(request.latitude)
        .bind(request.longitude)
        .bind(request.installed_capacity_kw)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(system)
    }

    /// `request.pv_system_id` is the row id of the system, as returned by [`Self::create_system`].
    #[instrument(skip(self, request), err)]
    pub async fn create_yield(&mut self, request: &PvYieldCreateDBRequest) -> Result<()> {
        sqlx::query("INSERT INTO pv_yield (pv_system_id, datetime_utc, solar_generation_kw) VALUES ($1, $2, $3)")
            .bind(request.pv_system_id)
            .bind(request.datetime_utc)
            .bind(request.solar_generation_kw)
            .execute(&mut *self.db)
            .await?;
        Ok(())
    }

    /// The most recent yield of every PV system, ordered by system id
    #[instrument(skip(self), err)]
    pub async fn latest(&mut self) -> Result<Vec<PvYieldDBResponse>> {
        let yields = sqlx::query_as::<_, PvYieldDBResponse>(
            r#"
            SELECT DISTINCT ON (s.id) y.id, s.pv_system_id, s.provider, y.datetime_utc, y.solar_generation_kw
            FROM pv_yield y
            JOIN pv_system s ON s.id = y.pv_system_id
            ORDER BY s.id, y.datetime_utc DESC
            "#,
        )
        .fetch_all(&mut *self.db)
        .await?;
        Ok(yields)
    }
}
