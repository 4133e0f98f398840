//! OpenAPI documentation, served as JSON at `/openapi.json` and rendered at `/docs`.

use axum::{Json, routing::MethodRouter, routing::get};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::{
    api::{self, models},
    config::{Config, RouteGroup},
};

/// Prefix the handler paths are declared under.
const DECLARED_PREFIX: &str = "/v0/GB/solar";

/// Bearer token issued by the identity provider.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "BearerAuth".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Access token from the Nowcasting identity provider, sent as:\n\n\
                            ```\nAuthorization: Bearer YOUR_TOKEN\n```",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Nowcasting API",
        description = include_str!("../description.md"),
        contact(name = "Open Climate Fix", url = "https://openclimatefix.org", email = "info@openclimatefix.org"),
        license(name = "MIT License", url = "https://github.com/openclimatefix/nowcasting_api/blob/main/LICENSE"),
    ),
    modifiers(&SecurityAddon),
    paths(
        api::handlers::root::get_api_information,
        api::handlers::gsp::get_all_forecasts,
        api::handlers::gsp::get_forecast_for_gsp,
        api::handlers::gsp::get_gsp_systems,
        api::handlers::status::get_status,
        api::handlers::pv::get_latest_pv_yields,
    ),
    components(
        schemas(
            models::info::ApiInformation,
            models::forecasts::ForecastValue,
            models::forecasts::Forecast,
            models::forecasts::ManyForecasts,
            models::locations::Location,
            models::status::Status,
            models::pv::PvYield,
        )
    ),
    tags(
        (name = "general", description = "Information about the API"),
        (name = "gsp", description = "Solar forecasts per grid supply point"),
        (name = "status", description = "Service status"),
        (name = "pv", description = "PV system yields"),
    )
)]
pub struct ApiDoc;

fn route_group_of(route: &str) -> Option<RouteGroup> {
    if route == "/status" {
        Some(RouteGroup::Status)
    } else if route.starts_with("/gsp/") {
        Some(RouteGroup::Gsp)
    } else if route.starts_with("/pv/") {
        Some(RouteGroup::Pv)
    } else {
        None
    }
}

/// The document for the routes `config` mounts, with paths under its `api_prefix`.
pub fn api_doc(config: &Config) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    let paths = std::mem::take(&mut doc.paths.paths);
    doc.paths.paths = paths
        .into_iter()
        .filter_map(|(path, item)| {
            let Some(route) = path.strip_prefix(DECLARED_PREFIX) else {
                return Some((path, item));
            };
            match route_group_of(route) {
                Some(group) if !config.is_mounted(group) => None,
                _ => Some((format!("{}{route}", config.api_prefix), item)),
            }
        })
        .collect();
    doc
}

/// Serves `doc` as JSON.
pub fn openapi_json<S>(doc: utoipa::openapi::OpenApi) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    get(move || {
        let doc = doc.clone();
        async move { Json(doc) }
    })
}
