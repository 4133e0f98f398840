//! Authentication for protected route groups.
//!
//! Authentication runs in two steps, both behind the [`AuthProvider`] trait:
//!
//! 1. [`AuthProvider::resolve_scheme`] inspects the request and decides how credentials are
//!    presented (a bearer token in the `Authorization` header).
//! 2. [`AuthProvider::resolve_user`] validates those credentials and yields a [`User`].
//!
//! Handlers ask for an [`AuthenticatedUser`], which runs both steps against the application's
//! provider. Failures become `401` responses carrying a `WWW-Authenticate: Bearer` challenge.
//!
//! # Providers
//!
//! - [`jwt::JwtAuthProvider`]: validates JWTs issued by the identity provider (production)
//! - [`StandInAuthProvider`]: accepts every request as a fixed user (tests and local runs)

pub mod jwt;

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    AppState,
    errors::{Error, Result},
};

/// How the caller presented their credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthScheme {
    Bearer { token: String },
    /// Produced by [`StandInAuthProvider`] without looking at the request
    StandIn,
}

/// The caller of a protected route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Determine how credentials are presented on this request.
    async fn resolve_scheme(&self, parts: &Parts) -> Result<AuthScheme>;

    /// Validate the credentials and resolve the caller.
    async fn resolve_user(&self, scheme: AuthScheme) -> Result<User>;
}

/// Extract `Authorization: Bearer <token>`.
pub fn bearer_scheme(parts: &Parts) -> Result<AuthScheme> {
    let Some(value) = parts.headers.get(header::AUTHORIZATION) else {
        return Err(Error::Unauthenticated { message: None });
    };

    let value = value.to_str().map_err(|_| Error::Unauthenticated {
        message: Some("Invalid authentication credentials".to_string()),
    })?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => Ok(AuthScheme::Bearer {
            token: token.trim().to_string(),
        }),
        _ => Err(Error::Unauthenticated {
            message: Some("Invalid authentication credentials".to_string()),
        }),
    }
}

/// Accepts every request as the same user.
#[derive(Debug, Clone)]
pub struct StandInAuthProvider {
    user: User,
}

impl StandInAuthProvider {
    pub fn new(user: User) -> Self {
        Self { user }
    }
}

impl Default for StandInAuthProvider {
    fn default() -> Self {
        Self::new(User {
            id: "stand-in".to_string(),
            email: Some("test@nowcasting.io".to_string()),
            permissions: vec!["read:forecasts".to_string()],
        })
    }
}

#[async_trait]
impl AuthProvider for StandInAuthProvider {
    async fn resolve_scheme(&self, _parts: &Parts) -> Result<AuthScheme> {
        Ok(AuthScheme::StandIn)
    }

    async fn resolve_user(&self, _scheme: AuthScheme) -> Result<User> {
        Ok(self.user.clone())
    }
}

/// Extractor for the authenticated caller of a protected route.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = Error;

    #[instrument(skip_all)]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let auth = &state.providers.auth;
        let scheme = auth.resolve_scheme(parts).await?;
        let user = auth.resolve_user(scheme).await?;
        debug!("Authenticated user {}", user.id);
        Ok(AuthenticatedUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/v0/GB/solar/gsp/forecast/all");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_scheme() {
        assert_eq!(
            bearer_scheme(&parts(Some("Bearer abc.def.ghi"))).unwrap(),
            AuthScheme::Bearer {
                token: "abc.def.ghi".to_string()
            }
        );
        assert_eq!(
            bearer_scheme(&parts(Some("bearer abc"))).unwrap(),
            AuthScheme::Bearer { token: "abc".to_string() }
        );
    }

    #[test]
    fn test_missing_or_malformed_header_is_unauthenticated() {
        for header in [None, Some("Basic dXNlcjpwYXNz"), Some("Bearer "), Some("Bearer")] {
            let err = bearer_scheme(&parts(header)).unwrap_err();
            assert!(matches!(err, Error::Unauthenticated { .. }), "{header:?}");
        }
    }

    #[tokio::test]
    async fn test_stand_in_ignores_the_request() {
        let provider = StandInAuthProvider::default();
        let scheme = provider.resolve_scheme(&parts(None)).await.unwrap();
        assert_eq!(scheme, AuthScheme::StandIn);

        let user = provider.resolve_user(scheme).await.unwrap();
        assert_eq!(user.id, "stand-in");
    }
}
