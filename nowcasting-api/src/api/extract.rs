//! Extractors for path and query parameters.
//!
//! Axum's own `Path` and `Query` reject with plain-text bodies. These wrappers turn rejections into
//! [`Error::Validation`] and then run the type's [`Validate`] checks, so malformed parameters are
//! reported as field-level 422 responses before a session is acquired.

use axum::{
    extract::{FromRequestParts, Path, Query},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::{
    api::models::{
        forecasts::{AllForecastsQuery, GspForecastQuery, GspPath, MAX_GSP_ID},
        locations::GspSystemsQuery,
    },
    errors::{Error, FieldError, Result},
};

/// Checks that go beyond what deserialization enforces.
pub trait Validate {
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

fn check_gsp_id(source: &str, gsp_id: u32) -> Result<()> {
    if gsp_id > MAX_GSP_ID {
        return Err(Error::Validation {
            errors: vec![FieldError::new(
                source,
                Some("gsp_id"),
                format!("Input should be less than or equal to {MAX_GSP_ID}"),
                "less_than_equal",
            )],
        });
    }
    Ok(())
}

impl Validate for GspPath {
    fn validate(&self) -> Result<()> {
        check_gsp_id("path", self.gsp_id)
    }
}

impl Validate for GspSystemsQuery {
    fn validate(&self) -> Result<()> {
        self.gsp_id.map_or(Ok(()), |gsp_id| check_gsp_id("query", gsp_id))
    }
}

impl Validate for AllForecastsQuery {}
impl Validate for GspForecastQuery {}

/// `Path<T>` followed by [`Validate::validate`].
#[derive(Debug)]
pub struct ValidatedPath<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidatedPath<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// `Query<T>` followed by [`Validate::validate`].
#[derive(Debug)]
pub struct ValidatedQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        value.validate()?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::{Router, routing::get};
    use axum_test::TestServer;

    async fn forecast(ValidatedPath(path): ValidatedPath<GspPath>) -> String {
        path.gsp_id.to_string()
    }

    async fn systems(ValidatedQuery(query): ValidatedQuery<GspSystemsQuery>) -> String {
        format!("{:?}", query.gsp_id)
    }

    fn server() -> TestServer {
        let app = Router::new()
            .route("/forecast/{gsp_id}", get(forecast))
            .route("/gsp_systems", get(systems));
        TestServer::new(app).unwrap()
    }

    #[tokio::test]
    async fn test_valid_parameters() {
        let server = server();
        server.get("/forecast/0").await.assert_text("0");
        server.get(&format!("/forecast/{MAX_GSP_ID}")).await.assert_text("317");
        server.get("/gsp_systems").await.assert_text("None");
        server.get("/gsp_systems?gsp_id=12").await.assert_text("Some(12)");
    }

    #[tokio::test]
    async fn test_gsp_id_out_of_range() {
        let response = server().get("/forecast/318").await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

        let body: serde_json::Value = response.json();
        assert_eq!(body["detail"][0]["loc"], serde_json::json!(["path", "gsp_id"]));
        assert_eq!(body["detail"][0]["type"], "less_than_equal");
    }

    #[tokio::test]
    async fn test_unparseable_gsp_id() {
        for path in ["/forecast/-1", "/forecast/abc"] {
            let response = server().get(path).await;
            response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

            let body: serde_json::Value = response.json();
            assert_eq!(body["detail"][0]["loc"][0], "path", "{path}");
        }
    }

    #[tokio::test]
    async fn test_bad_query_is_validation_error() {
        let response = server().get("/gsp_systems?gsp_id=lots").await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

        let body: serde_json::Value = response.json();
        assert_eq!(body["detail"][0]["loc"], serde_json::json!(["query"]));
    }

    #[test]
    fn test_query_bounds() {
        assert!(GspSystemsQuery { gsp_id: Some(400) }.validate().is_err());
        assert!(GspSystemsQuery { gsp_id: None }.validate().is_ok());
    }
}
