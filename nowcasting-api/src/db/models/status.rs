use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct StatusCreateDBRequest {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct StatusDBResponse {
    pub id: i32,
    pub status: String,
    pub message: String,
    pub created_utc: DateTime<Utc>,
}
