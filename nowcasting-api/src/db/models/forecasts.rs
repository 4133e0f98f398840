use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::locations::LocationDBResponse;

/// A single predicted value, as inserted alongside its forecast
#[derive(Debug, Clone)]
pub struct ForecastValueCreateDBRequest {
    pub target_time: DateTime<Utc>,
    pub expected_power_generation_megawatts: f64,
}

/// Database request for creating a forecast together with its values
#[derive(Debug, Clone)]
pub struct ForecastCreateDBRequest {
    pub location_id: i32,
    pub model_name: String,
    pub forecast_creation_time: DateTime<Utc>,
    pub historic: bool,
    pub input_data_last_updated: DateTime<Utc>,
    pub values: Vec<ForecastValueCreateDBRequest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ForecastValueDBResponse {
    pub id: i64,
    pub forecast_id: i64,
    pub target_time: DateTime<Utc>,
    pub expected_power_generation_megawatts: f64,
}

/// Database response for a forecast, with its location and values attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDBResponse {
    pub id: i64,
    pub location: LocationDBResponse,
    pub model_name: String,
    pub forecast_creation_time: DateTime<Utc>,
    pub historic: bool,
    pub input_data_last_updated: DateTime<Utc>,
    pub values: Vec<ForecastValueDBResponse>,
}
