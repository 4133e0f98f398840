use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct PvSystemCreateDBRequest {
    pub pv_system_id: i32,
    pub provider: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub installed_capacity_kw: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PvSystemDBResponse {
    pub id: i32,
    pub pv_system_id: i32,
    pub provider: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub installed_capacity_kw: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct PvYieldCreateDBRequest {
    pub pv_system_id: i32,
    pub datetime_utc: DateTime<Utc>,
    pub solar_generation_kw: f64,
}

/// A yield row joined with the public identifier of its system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PvYieldDBResponse {
    pub id: i64,
    pub pv_system_id: i32,
    pub provider: String,
    pub datetime_utc: DateTime<Utc>,
    pub solar_generation_kw: f64,
}
