use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const API_TITLE: &str = "Nowcasting API";
pub const API_DESCRIPTION: &str = include_str!("../../description.md");
pub const DOCUMENTATION_URL: &str = "https://api.nowcasting.io/docs";

/// Basic information about the API, served at `/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ApiInformation {
    pub title: String,
    pub version: String,
    pub description: String,
    pub documentation: String,
}

impl Default for ApiInformation {
    fn default() -> Self {
        Self {
            title: API_TITLE.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: API_DESCRIPTION.to_string(),
            documentation: DOCUMENTATION_URL.to_string(),
        }
    }
}
