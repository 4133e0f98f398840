//! API models for solar forecasts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::api::models::locations::Location;
use crate::db::models::forecasts::{ForecastDBResponse, ForecastValueDBResponse};

/// Highest GSP id served by the API; 0 is the national total.
pub const MAX_GSP_ID: u32 = 317;

/// One predicted value of a forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForecastValue {
    /// Start of the 30 minute period the value is for
    pub target_time: DateTime<Utc>,
    pub expected_power_generation_megawatts: f64,
}

impl From<ForecastValueDBResponse> for ForecastValue {
    fn from(db: ForecastValueDBResponse) -> Self {
        Self {
            target_time: db.target_time,
            expected_power_generation_megawatts: db.expected_power_generation_megawatts,
        }
    }
}

/// A forecast for one GSP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Forecast {
    pub location: Location,
    #[schema(example = "pvnet_v2")]
    pub model_name: String,
    pub forecast_creation_time: DateTime<Utc>,
    /// Whether this is the blended historic forecast rather than a live run
    pub historic: bool,
    /// When the inputs (NWP, satellite, PV) feeding this forecast were last updated
    pub input_data_last_updated: DateTime<Utc>,
    pub forecast_values: Vec<ForecastValue>,
}

impl From<ForecastDBResponse> for Forecast {
    fn from(db: ForecastDBResponse) -> Self {
        Self {
            location: db.location.into(),
            model_name: db.model_name,
            forecast_creation_time: db.forecast_creation_time,
            historic: db.historic,
            input_data_last_updated: db.input_data_last_updated,
            forecast_values: db.values.into_iter().map(Into::into).collect(),
        }
    }
}

/// The latest forecast of every GSP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManyForecasts {
    pub forecasts: Vec<Forecast>,
}

impl FromIterator<ForecastDBResponse> for ManyForecasts {
    fn from_iter<I: IntoIterator<Item = ForecastDBResponse>>(iter: I) -> Self {
        Self {
            forecasts: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Query parameters for all GSP forecasts
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AllForecastsQuery {
    /// Return the historic forecasts instead of the live ones
    #[serde(default)]
    pub historic: bool,
    /// Only include values targeting this time or later
    pub start_datetime_utc: Option<DateTime<Utc>>,
}

/// Query parameters for a single GSP forecast
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GspForecastQuery {
    /// Only include values targeting this time or later
    pub start_datetime_utc: Option<DateTime<Utc>>,
}

/// Path parameters for a single GSP forecast
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Path)]
pub struct GspPath {
    /// GSP id, between 0 and 317
    #[param(minimum = 0, maximum = 317)]
    pub gsp_id: u32,
}
