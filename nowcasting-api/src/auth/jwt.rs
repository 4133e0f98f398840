//! Bearer JWT validation against the configured identity provider.

use async_trait::async_trait;
use axum::http::request::Parts;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::{
    auth::{AuthProvider, AuthScheme, User, bearer_scheme},
    config::AuthConfig,
    errors::{Error, Result},
};

/// Claims read from an access token.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    pub exp: i64,
}

impl From<AccessClaims> for User {
    fn from(claims: AccessClaims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            permissions: claims.permissions,
        }
    }
}

pub struct JwtAuthProvider {
    /// `None` when no key is configured; every token is then rejected
    key: Option<DecodingKey>,
    validation: Validation,
}

impl JwtAuthProvider {
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        let (key, algorithm) = match (&config.secret, &config.public_key_pem) {
            (Some(secret), _) => (Some(DecodingKey::from_secret(secret.as_bytes())), Algorithm::HS256),
            (None, Some(pem)) => {
                let key = DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| Error::Internal {
                    operation: format!("load auth.public_key_pem: {e}"),
                })?;
                (Some(key), Algorithm::RS256)
            }
            (None, None) => {
                warn!("No token verification key configured; protected routes will reject every request");
                (None, Algorithm::RS256)
            }
        };

        let mut validation = Validation::new(algorithm);
        if let Some(domain) = &config.domain {
            validation.set_issuer(&[format!("https://{domain}/")]);
        }
        match &config.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        Ok(Self { key, validation })
    }

    fn verify(&self, token: &str) -> Result<User> {
        let Some(key) = &self.key else {
            return Err(Error::Unauthenticated { message: None });
        };

        let token_data = decode::<AccessClaims>(token, key, &self.validation).map_err(|e| match e.kind() {
            // Client errors (401) - malformed tokens, invalid claims, expired tokens
            ErrorKind::InvalidToken
            | ErrorKind::InvalidSignature
            | ErrorKind::ExpiredSignature
            | ErrorKind::MissingRequiredClaim(_)
            | ErrorKind::InvalidIssuer
            | ErrorKind::InvalidAudience
            | ErrorKind::InvalidSubject
            | ErrorKind::ImmatureSignature
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_)
            | ErrorKind::InvalidAlgorithm => Error::Unauthenticated {
                message: Some("Invalid authentication credentials".to_string()),
            },

            // Server errors (500) - key issues, internal failures
            _ => Error::Internal {
                operation: format!("JWT verification: {e}"),
            },
        })?;

        Ok(User::from(token_data.claims))
    }
}

#[async_trait]
impl AuthProvider for JwtAuthProvider {
    async fn resolve_scheme(&self, parts: &Parts) -> Result<AuthScheme> {
        bearer_scheme(parts)
    }

    #[instrument(skip_all, err)]
    async fn resolve_user(&self, scheme: AuthScheme) -> Result<User> {
        match scheme {
            AuthScheme::Bearer { token } => self.verify(&token),
            AuthScheme::StandIn => Err(Error::Unauthenticated { message: None }),
        }
    }
}
