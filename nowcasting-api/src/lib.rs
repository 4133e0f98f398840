//! # nowcasting-api: solar nowcasts per grid supply point over HTTP
//!
//! `nowcasting-api` serves the output of Open Climate Fix's solar nowcasting model: forecasts of
//! solar generation, in 30 minute steps up to eight hours ahead, for Great Britain as a whole and
//! for each of its grid supply points (GSPs). It is a read-only JSON API over the forecast
//! datastore that the forecasting pipeline writes to.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) and reads from
//! PostgreSQL through the repositories in [`db`].
//!
//! ### Request Flow
//!
//! A request passes through tracing, the process-time middleware (which sets `X-Process-Time`),
//! the CORS origin guard and the CORS layer before reaching the router. Route groups are mounted
//! under the configured prefix (`/v0/GB/solar` by default):
//!
//! - `gsp` at `{prefix}/gsp`: forecasts and locations per GSP, authenticated
//! - `status` at `{prefix}`: the latest service status
//! - `pv` at `{prefix}/pv`: latest PV yields, authenticated and only mounted when configured
//!
//! Handlers obtain their dependencies through extractors. [`session::DbSession`] asks the
//! [`session::SessionProvider`] for a database session and [`auth::AuthenticatedUser`] asks the
//! [`auth::AuthProvider`] to authenticate the caller. Both providers are held in [`Providers`] and
//! passed to [`build_router`] explicitly, which is how tests swap in a shared, rolled-back session
//! and a stand-in user.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use nowcasting_api::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = nowcasting_api::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     nowcasting_api::telemetry::init_telemetry(&config.log_level, config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod middleware;
mod openapi;
pub mod session;
mod static_assets;
pub mod telemetry;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{HeaderValue, Uri},
    middleware::{from_fn, from_fn_with_state},
    routing::get,
};
use bon::Builder;
pub use config::Config;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    api::handlers::{gsp, pv, root, status},
    auth::{AuthProvider, jwt::JwtAuthProvider},
    config::{CorsConfig, RouteGroup},
    db::DatabaseConnection,
    errors::Error,
    middleware::{PROCESS_TIME_HEADER, cors_guard, process_time},
    session::{PoolSessionProvider, SessionProvider},
};

/// The overridable dependencies of request handlers.
///
/// Production wiring comes from [`Providers::from_config`]; tests replace either provider.
#[derive(Clone)]
pub struct Providers {
    pub sessions: Arc<dyn SessionProvider>,
    pub auth: Arc<dyn AuthProvider>,
}

impl Providers {
    pub fn new(sessions: Arc<dyn SessionProvider>, auth: Arc<dyn AuthProvider>) -> Self {
        Self { sessions, auth }
    }

    /// Pool-backed sessions and JWT authentication.
    pub fn from_config(config: &Config, db: &DatabaseConnection) -> errors::Result<Self> {
        Ok(Self::new(
            Arc::new(PoolSessionProvider::new(db.pool().clone())),
            Arc::new(JwtAuthProvider::from_config(&config.auth)?),
        ))
    }

    pub fn with_sessions(mut self, sessions: Arc<dyn SessionProvider>) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn with_auth(mut self, auth: Arc<dyn AuthProvider>) -> Self {
        self.auth = auth;
        self
    }
}

/// Application state shared across all request handlers.
///
/// ```ignore
/// let state = AppState::builder().config(config).providers(providers).build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Arc<Config>,
    pub providers: Providers,
}

fn create_cors_layer(cors: &CorsConfig) -> anyhow::Result<CorsLayer> {
    // `*` is invalid alongside credentials; echo the request origin
    let allow_origin = if cors.has_wildcard() && cors.allow_credentials {
        AllowOrigin::mirror_request()
    } else if cors.has_wildcard() {
        AllowOrigin::any()
    } else {
        let mut origins = Vec::new();
        for origin in &cors.allowed_origins {
            if let Some(origin) = origin.origin() {
                origins.push(origin.parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    // Wildcard methods and headers are not allowed together with credentials, so mirror them
    let mut layer = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(cors.allow_credentials)
        .expose_headers([PROCESS_TIME_HEADER]);

    if let Some(max_age) = cors.max_age {
        layer = layer.max_age(Duration::from_secs(max_age));
    }

    Ok(layer)
}

async fn route_not_found(uri: Uri) -> Error {
    Error::RouteNotFound {
        path: uri.path().to_string(),
    }
}

/// Build the application router with every enabled route group and the middleware chain.
///
/// Outer to inner: request tracing, `X-Process-Time`, CORS origin guard, CORS layer, routes.
#[instrument(skip_all)]
pub fn build_router(config: Arc<Config>, providers: Providers) -> anyhow::Result<Router> {
    let state = AppState::builder().config(config.clone()).providers(providers).build();

    let mut api_routes: Option<Router<AppState>> = None;
    for group in RouteGroup::ALL.into_iter().filter(|g| config.is_mounted(*g)) {
        let routes = match group {
            RouteGroup::Gsp => Router::new().nest("/gsp", gsp::router()),
            RouteGroup::Status => status::router(),
            RouteGroup::Pv => Router::new().nest("/pv", pv::router()),
        };
        debug!("Mounting route group {:?} under {}", group, config.api_prefix);
        api_routes = Some(match api_routes {
            Some(existing) => existing.merge(routes),
            None => routes,
        });
    }

    let document = openapi::api_doc(&config);
    let mut router = Router::new()
        .route("/", get(root::get_api_information))
        .route("/favicon.ico", get(root::get_favicon))
        .route("/openapi.json", openapi::openapi_json(document.clone()));
    if let Some(api_routes) = api_routes {
        router = router.nest(&config.api_prefix, api_routes);
    }

    let router = router
        .with_state(state)
        .merge(Scalar::with_url("/docs", document))
        .fallback(route_not_found);

    let cors = Arc::new(config.cors.clone());
    let router = router
        .layer(create_cors_layer(&cors)?)
        .layer(from_fn_with_state(cors, cors_guard))
        .layer(from_fn(process_time))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    Ok(router)
}

pub struct Application {
    router: Router,
    config: Arc<Config>,
    db: DatabaseConnection,
}

impl Application {
    /// Connect to the datastore and assemble the router.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting nowcasting API with configuration: {:#?}", config);

        let db = DatabaseConnection::connect(&config.database.url, &config.database.pool).await?;
        let providers = Providers::from_config(&config, &db)?;
        Self::with_providers(config, db, providers)
    }

    /// Assemble the application around an existing connection and providers.
    pub fn with_providers(config: Config, db: DatabaseConnection, providers: Providers) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let router = build_router(config.clone(), providers)?;
        Ok(Self { router, config, db })
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Nowcasting API listening on http://{}, docs at http://localhost:{}/docs",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.db.close().await;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::info::API_DESCRIPTION;
    use crate::config::CorsOrigin;
    use crate::test_utils::{UnavailableSessionProvider, create_test_config, stand_in_providers};
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::Value;

    fn server(config: Config) -> TestServer {
        let router = build_router(Arc::new(config), stand_in_providers(Arc::new(UnavailableSessionProvider))).unwrap();
        TestServer::new(router).unwrap()
    }

    fn process_time(response: &axum_test::TestResponse) -> f64 {
        response.header(PROCESS_TIME_HEADER).to_str().unwrap().parse().unwrap()
    }

    #[test_log::test(tokio::test)]
    async fn test_root_returns_api_information() {
        let response = server(create_test_config()).get("/").await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(
            body,
            serde_json::json!({
                "title": "Nowcasting API",
                "version": env!("CARGO_PKG_VERSION"),
                "description": API_DESCRIPTION,
                "documentation": "https://api.nowcasting.io/docs",
            })
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_favicon_is_served() {
        let response = server(create_test_config()).get("/favicon.ico").await;
        response.assert_status_ok();
        assert_eq!(response.header("content-type"), "image/x-icon");
        assert!(!response.as_bytes().is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn test_openapi_document() {
        let response = server(create_test_config()).get("/openapi.json").await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["info"]["title"], "Nowcasting API");
        assert!(body["paths"]["/v0/GB/solar/gsp/forecast/all"].is_object());
    }

    #[test_log::test(tokio::test)]
    async fn test_unknown_route_is_json_404_with_process_time() {
        let response = server(create_test_config()).get("/v0/GB/solar/nope").await;
        response.assert_status(StatusCode::NOT_FOUND);
        response.assert_json(&serde_json::json!({ "detail": "Not Found" }));
        assert!(process_time(&response) >= 0.0);
    }

    #[test_log::test(tokio::test)]
    async fn test_process_time_on_every_kind_of_response() {
        let server = server(create_test_config());

        // 200, 422 (validation before any session), 503 (session unavailable)
        for (path, status) in [
            ("/", StatusCode::OK),
            ("/v0/GB/solar/gsp/forecast/9999", StatusCode::UNPROCESSABLE_ENTITY),
            ("/v0/GB/solar/gsp/forecast/1", StatusCode::SERVICE_UNAVAILABLE),
            ("/v0/GB/solar/status", StatusCode::SERVICE_UNAVAILABLE),
        ] {
            let response = server.get(path).await;
            response.assert_status(status);
            assert!(process_time(&response) >= 0.0, "{path}");
        }

        let response = server.get("/").add_header("origin", "https://evil.example.com").await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert!(process_time(&response) >= 0.0);
    }

    #[test_log::test(tokio::test)]
    async fn test_cors_headers_for_allowed_origin() {
        let response = server(create_test_config())
            .get("/")
            .add_header("origin", "https://app.nowcasting.io")
            .await;

        response.assert_status_ok();
        assert_eq!(response.header("access-control-allow-origin"), "https://app.nowcasting.io");
        assert_eq!(response.header("access-control-allow-credentials"), "true");
    }

    #[test_log::test(tokio::test)]
    async fn test_wildcard_origin_with_credentials_echoes_origin() {
        let mut config = create_test_config();
        config.cors.allowed_origins = vec![CorsOrigin::Wildcard];

        let response = server(config).get("/").add_header("origin", "https://any.example.com").await;

        response.assert_status_ok();
        assert_eq!(response.header("access-control-allow-origin"), "https://any.example.com");
        assert_eq!(response.header("access-control-allow-credentials"), "true");
    }

    #[test_log::test(tokio::test)]
    async fn test_cors_preflight() {
        let response = server(create_test_config())
            .method(axum::http::Method::OPTIONS, "/v0/GB/solar/gsp/forecast/all")
            .add_header("origin", "https://app.nowcasting.io")
            .add_header("access-control-request-method", "GET")
            .add_header("access-control-request-headers", "authorization")
            .await;

        response.assert_status_ok();
        assert_eq!(response.header("access-control-allow-origin"), "https://app.nowcasting.io");
        assert_eq!(response.header("access-control-allow-headers"), "authorization");
    }

    #[test_log::test(tokio::test)]
    async fn test_pv_group_disabled_by_default() {
        let response = server(create_test_config()).get("/v0/GB/solar/pv/pv_latest").await;
        response.assert_status(StatusCode::NOT_FOUND);

        let mut config = create_test_config();
        config.route_groups.push(RouteGroup::Pv);
        let response = server(config).get("/v0/GB/solar/pv/pv_latest").await;
        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test_log::test(tokio::test)]
    async fn test_custom_prefix_and_groups() {
        let mut config = create_test_config();
        config.api_prefix = "/v1".to_string();
        config.route_groups = vec![RouteGroup::Status, RouteGroup::Status];
        let server = server(config);

        server.get("/v1/status").await.assert_status(StatusCode::SERVICE_UNAVAILABLE);
        server.get("/v1/gsp/forecast/all").await.assert_status(StatusCode::NOT_FOUND);
        server.get("/v0/GB/solar/status").await.assert_status(StatusCode::NOT_FOUND);

        let doc: Value = server.get("/openapi.json").await.json();
        assert!(doc["paths"]["/v1/status"].is_object());
        assert!(doc["paths"]["/v0/GB/solar/status"].is_null());
        assert!(doc["paths"]["/v1/gsp/forecast/all"].is_null());
    }

    #[test_log::test(tokio::test)]
    async fn test_listed_groups_mount_once_in_any_order() {
        let mut config = create_test_config();
        config.route_groups = vec![RouteGroup::Pv, RouteGroup::Gsp, RouteGroup::Pv];
        let server = server(config);

        server.get("/v0/GB/solar/pv/pv_latest").await.assert_status(StatusCode::SERVICE_UNAVAILABLE);
        server.get("/v0/GB/solar/gsp/gsp_systems").await.assert_status(StatusCode::SERVICE_UNAVAILABLE);
        server.get("/v0/GB/solar/status").await.assert_status(StatusCode::NOT_FOUND);
    }

    #[test_log::test(tokio::test)]
    async fn test_protected_routes_require_credentials() {
        let config = Arc::new(create_test_config());
        let providers = stand_in_providers(Arc::new(UnavailableSessionProvider))
            .with_auth(Arc::new(JwtAuthProvider::from_config(&config.auth).unwrap()));
        let server = TestServer::new(build_router(config, providers).unwrap()).unwrap();

        let response = server.get("/v0/GB/solar/gsp/forecast/all").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.header("www-authenticate"), "Bearer");

        let response = server
            .get("/v0/GB/solar/gsp/forecast/all")
            .authorization_bearer("not-a-token")
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);

        // Status stays public
        server.get("/v0/GB/solar/status").await.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_cors_layer_builds_from_default_config() {
        assert!(create_cors_layer(&CorsConfig::default()).is_ok());

        for allow_credentials in [false, true] {
            let open = CorsConfig {
                allowed_origins: vec![CorsOrigin::Wildcard],
                allow_credentials,
                max_age: None,
            };
            assert!(create_cors_layer(&open).is_ok());
        }
    }
}
