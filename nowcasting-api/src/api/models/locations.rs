//! API models for grid supply point locations.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::db::models::locations::LocationDBResponse;

/// A grid supply point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// GSP identifier; 0 is the national total
    #[schema(example = 122)]
    pub gsp_id: i32,
    /// Short GSP name
    #[schema(example = "FIDF_1")]
    pub label: String,
    #[schema(example = "Fiddlers Ferry")]
    pub region_name: Option<String>,
    #[schema(example = "_D")]
    pub gsp_group: Option<String>,
    /// Installed PV capacity in megawatts
    pub installed_capacity_mw: Option<f64>,
}

impl From<LocationDBResponse> for Location {
    fn from(db: LocationDBResponse) -> Self {
        Self {
            gsp_id: db.gsp_id,
            label: db.label,
            region_name: db.region_name,
            gsp_group: db.gsp_group,
            installed_capacity_mw: db.installed_capacity_mw,
        }
    }
}

/// Query parameters for listing GSP systems
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GspSystemsQuery {
    /// Only return this GSP; omit for all of them
    pub gsp_id: Option<u32>,
}
