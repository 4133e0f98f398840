//! Request middleware applied around the whole router.
//!
//! Outer to inner: request tracing, [`process_time`], [`cors_guard`], then the `tower_http`
//! CORS layer built by [`crate::create_cors_layer`].

use std::{sync::Arc, time::Instant};

use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use crate::{config::CorsConfig, errors::Error};

pub const PROCESS_TIME_HEADER: HeaderName = HeaderName::from_static("x-process-time");

/// Time the whole inner stack and report it as `X-Process-Time` (seconds).
///
/// Error, fallback and rejection responses are all plain responses by the time they reach this
/// layer, so every response gets the header.
pub async fn process_time(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let mut response = next.run(request).await;
    let elapsed = start.elapsed().as_secs_f64();

    debug!("Process time {elapsed:.6}s");
    if let Ok(value) = HeaderValue::from_str(&elapsed.to_string()) {
        response.headers_mut().insert(PROCESS_TIME_HEADER, value);
    }
    response
}

/// Reject requests whose `Origin` is not on the allow-list before they are routed.
pub async fn cors_guard(State(cors): State<Arc<CorsConfig>>, request: Request, next: Next) -> Response {
    if let Some(origin) = request.headers().get(header::ORIGIN) {
        let allowed = origin.to_str().is_ok_and(|origin| cors.allows(origin));
        if !allowed {
            warn!("Rejected request from disallowed origin {:?}", origin);
            return Error::BadRequest {
                message: "Disallowed CORS origin".to_string(),
            }
            .into_response();
        }
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CorsOrigin;
    use axum::{Router, body::Body, http::Request as HttpRequest, http::StatusCode, middleware::from_fn, middleware::from_fn_with_state, routing::get};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    fn router(hits: Arc<AtomicUsize>) -> Router {
        let cors = Arc::new(CorsConfig {
            allowed_origins: vec![CorsOrigin::parse("https://app.nowcasting.io").unwrap()],
            allow_credentials: true,
            max_age: None,
        });

        Router::new()
            .route(
                "/",
                get(move || async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    "ok"
                }),
            )
            .layer(from_fn_with_state(cors, cors_guard))
            .layer(from_fn(process_time))
    }

    fn process_time_of(response: &Response) -> f64 {
        response.headers()[PROCESS_TIME_HEADER].to_str().unwrap().parse().unwrap()
    }

    #[test_log::test(tokio::test)]
    async fn test_process_time_header_is_set() {
        let response = router(Arc::default())
            .oneshot(HttpRequest::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(process_time_of(&response) >= 0.0);
    }

    #[test_log::test(tokio::test)]
    async fn test_allowed_origin_passes() {
        let hits = Arc::new(AtomicUsize::new(0));
        let response = router(hits.clone())
            .oneshot(
                HttpRequest::get("/")
                    .header(header::ORIGIN, "https://app.nowcasting.io")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test_log::test(tokio::test)]
    async fn test_disallowed_origin_never_reaches_handler() {
        let hits = Arc::new(AtomicUsize::new(0));
        let response = router(hits.clone())
            .oneshot(
                HttpRequest::get("/")
                    .header(header::ORIGIN, "https://evil.example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(process_time_of(&response) >= 0.0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
