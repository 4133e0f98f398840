use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::status::StatusDBResponse;

/// Service status as published by the forecasting pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    #[schema(example = "ok")]
    pub status: String,
    pub message: String,
    pub created_utc: DateTime<Utc>,
}

impl From<StatusDBResponse> for Status {
    fn from(db: StatusDBResponse) -> Self {
        Self {
            status: db.status,
            message: db.message,
            created_utc: db.created_utc,
        }
    }
}
