use crate::db::errors::DbError;
use axum::{
    Json,
    extract::rejection::{PathRejection, QueryRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error as ThisError;

/// One field-level problem in a request, located the way clients address it
/// (e.g. `["path", "gsp_id"]` or `["query", "start_datetime_utc"]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub loc: Vec<String>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl FieldError {
    pub fn new(source: &str, field: Option<&str>, msg: impl Into<String>, kind: &str) -> Self {
        let mut loc = vec![source.to_string()];
        if let Some(field) = field {
            loc.push(field.to_string());
        }
        Self {
            loc,
            msg: msg.into(),
            kind: kind.to_string(),
        }
    }
}

#[derive(ThisError, Debug)]
pub enum Error {
    /// Authentication required but not provided, or credentials rejected
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    /// A session could not be acquired from the database
    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    /// Requested resource not found
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// No route matched the request path
    #[error("No route for {path}")]
    RouteNotFound { path: String },

    /// Malformed path or query parameters
    #[error("Request validation failed")]
    Validation { errors: Vec<FieldError> },

    /// Invalid request data
    #[error("{message}")]
    BadRequest { message: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Error::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Error::NotFound { .. } | Error::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            Error::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::ForeignKeyViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::SessionClosed | DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated { message } => message.clone().unwrap_or_else(|| "Not authenticated".to_string()),
            Error::ServiceUnavailable { .. } => "Service temporarily unavailable".to_string(),
            Error::NotFound { resource, id } => format!("{resource} with ID {id} not found"),
            Error::RouteNotFound { .. } => "Not Found".to_string(),
            Error::Validation { .. } => "Request validation failed".to_string(),
            Error::BadRequest { message } => message.clone(),
            Error::Internal { .. } | Error::Other(_) => "Internal server error".to_string(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Resource not found".to_string(),
                DbError::Unavailable(_) => "Service temporarily unavailable".to_string(),
                DbError::UniqueViolation { .. } => "Resource already exists".to_string(),
                DbError::ForeignKeyViolation { .. } => "Invalid reference to related resource".to_string(),
                DbError::SessionClosed | DbError::Other(_) => "Database error occurred".to_string(),
            },
        }
    }

    pub fn not_found(resource: impl Into<String>, id: impl ToString) -> Self {
        Error::NotFound {
            resource: resource.into(),
            id: id.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Database(DbError::Other(_) | DbError::SessionClosed) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::ServiceUnavailable { .. } | Error::Database(DbError::Unavailable(_)) => {
                tracing::warn!("Database unavailable: {}", self);
            }
            Error::Database(_) => {
                tracing::warn!("Database constraint error: {}", self);
            }
            Error::Unauthenticated { .. } => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::BadRequest { .. } | Error::NotFound { .. } | Error::RouteNotFound { .. } | Error::Validation { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();

        match self {
            Error::Validation { errors } => (status, Json(json!({ "detail": errors }))).into_response(),
            Error::Unauthenticated { .. } => {
                let body = Json(json!({ "detail": self.user_message() }));
                (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
            }
            other => (status, Json(json!({ "detail": other.user_message() }))).into_response(),
        }
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        use axum::extract::path::ErrorKind;

        let (field, kind) = match &rejection {
            PathRejection::FailedToDeserializePathParams(inner) => match inner.kind() {
                ErrorKind::ParseErrorAtKey { key, .. } => (Some(key.clone()), "parse_error"),
                ErrorKind::InvalidUtf8InPathParam { key } => (Some(key.clone()), "invalid_utf8"),
                ErrorKind::DeserializeError { key, .. } => (Some(key.clone()), "value_error"),
                _ => (None, "value_error"),
            },
            _ => (None, "missing"),
        };

        Error::Validation {
            errors: vec![FieldError::new("path", field.as_deref(), rejection.body_text(), kind)],
        }
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Error::Validation {
            errors: vec![FieldError::new("query", None, rejection.body_text(), "value_error")],
        }
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
