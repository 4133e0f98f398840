//! Database repository for service status records.

use sqlx::PgConnection;
use tracing::instrument;

use crate::db::{
    errors::Result,
    models::status::{StatusCreateDBRequest, StatusDBResponse},
};

pub struct Statuses<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Statuses<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(status = %request.status), err)]
    pub async fn create(&mut self, request: &StatusCreateDBRequest) -> Result<StatusDBResponse> {
        let status = sqlx::query_as::<_, StatusDBResponse>(
            "INSERT INTO status (status, message) VALUES ($1, $2) RETURNING *",
        )
        .bind(&request.status)
        .bind(&request.message)
        .fetch_one(&mut *self.db)
        .await?;
        Ok(status)
    }

    /// Most recently created status, if any has been recorded
    #[instrument(skip(self), err)]
    pub async fn latest(&mut self) -> Result<Option<StatusDBResponse>> {
        let status = sqlx::query_as::<_, StatusDBResponse>("SELECT * FROM status ORDER BY created_utc DESC, id DESC LIMIT 1")
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(status)
    }
}
