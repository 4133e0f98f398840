use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::models::pv::PvYieldDBResponse;

/// Most recent yield reported by one PV system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PvYield {
    pub pv_system_id: i32,
    #[schema(example = "pvoutput.org")]
    pub provider: String,
    pub datetime_utc: DateTime<Utc>,
    pub solar_generation_kw: f64,
}

impl From<PvYieldDBResponse> for PvYield {
    fn from(db: PvYieldDBResponse) -> Self {
        Self {
            pv_system_id: db.pv_system_id,
            provider: db.provider,
            datetime_utc: db.datetime_utc,
            solar_generation_kw: db.solar_generation_kw,
        }
    }
}
