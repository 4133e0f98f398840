use serde::{Deserialize, Serialize};

/// Database request for creating a GSP location
#[derive(Debug, Clone)]
pub struct LocationCreateDBRequest {
    pub gsp_id: i32,
    pub label: String,
    pub region_name: Option<String>,
    pub gsp_group: Option<String>,
    pub installed_capacity_mw: Option<f64>,
}

/// Database response for a GSP location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LocationDBResponse {
    pub id: i32,
    pub gsp_id: i32,
    pub label: String,
    pub region_name: Option<String>,
    pub gsp_group: Option<String>,
    pub installed_capacity_mw: Option<f64>,
}
