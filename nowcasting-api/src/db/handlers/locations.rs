//! Database repository for GSP locations.

use sqlx::PgConnection;
use tracing::instrument;

use crate::db::{
    errors::Result,
    handlers::repository::Repository,
    models::locations::{LocationCreateDBRequest, LocationDBResponse},
};

/// Filter for listing locations
#[derive(Debug, Clone, Default)]
pub struct LocationFilter {
    /// Only return these GSP ids; `None` returns every location
    pub gsp_ids: Option<Vec<i32>>,
}

pub struct Locations<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Locations<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Locations<'c> {
    type CreateRequest = LocationCreateDBRequest;
    type Response = LocationDBResponse;
    type Id = i32;
    type Filter = LocationFilter;

    #[instrument(skip(self, request), fields(gsp_id = request.gsp_id), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let location = sqlx::query_as::<_, LocationDBResponse>(
            r#"
            INSERT INTO location (gsp_id, label, region_name, gsp_group, installed_capacity_mw)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(request.gsp_id)
        .bind(&request.label)
        .bind(&request.region_name)
        .bind(&request.gsp_group)
        .bind(request.installed_capacity_mw)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(location)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let location = sqlx::query_as::<_, LocationDBResponse>("SELECT * FROM location WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(location)
    }

    #[instrument(skip(self), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let locations = sqlx::query_as::<_, LocationDBResponse>(
            r#"
            SELECT * FROM location
            WHERE ($1::int4[] IS NULL OR gsp_id = ANY($1))
            ORDER BY gsp_id
            "#,
        )
        .bind(&filter.gsp_ids)
        .fetch_all(&mut *self.db)
        .await?;
        Ok(locations)
    }
}
