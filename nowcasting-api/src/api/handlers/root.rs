//! Routes served at the root regardless of configuration.

use axum::{
    Json,
    body::Body,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::{info, instrument};

use crate::{api::models::info::ApiInformation, errors::Error, static_assets};

/// Get basic information about the Nowcasting API
#[utoipa::path(
    get,
    path = "/",
    tag = "general",
    summary = "API information",
    responses(
        (status = 200, description = "Title, version, description and documentation link", body = ApiInformation),
    )
)]
#[instrument(skip_all)]
pub async fn get_api_information() -> Json<ApiInformation> {
    info!("Route / has been called");
    Json(ApiInformation::default())
}

const FAVICON: &str = "favicon.ico";

#[instrument(skip_all)]
pub async fn get_favicon() -> Response {
    let Some(content) = static_assets::Assets::get(FAVICON) else {
        return Error::RouteNotFound { path: format!("/{FAVICON}") }.into_response();
    };
    let mime = mime_guess::from_path(FAVICON).first_or_octet_stream();

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime.as_ref().to_string()),
            (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
        ],
        Body::from(content.data.into_owned()),
    )
        .into_response()
}
