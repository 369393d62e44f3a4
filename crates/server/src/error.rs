//! HTTP error mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cadence_domain::{AuthError, DomainError};
use cadence_infrastructure::AdapterError;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::config::ConfigError;

/// Structured JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable description.
    pub message: String,
}

/// Errors returned by request handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Token lifecycle or upstream failure.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The request itself is malformed.
    #[error("{0}")]
    InvalidRequest(String),

    /// The request carries neither a bearer token nor a session.
    #[error("Access token is required")]
    MissingCredentials,
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

impl ApiError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::MissingCredentials => StatusCode::UNAUTHORIZED,
            Self::Auth(err) => match err {
                AuthError::Unauthenticated
                | AuthError::TokenExpired
                | AuthError::RefreshFailed { .. } => StatusCode::UNAUTHORIZED,
                AuthError::AccessDenied { .. } => StatusCode::FORBIDDEN,
                AuthError::InvalidGrant { .. } => StatusCode::BAD_REQUEST,
                AuthError::Upstream { status, .. } => {
                    StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
                }
                AuthError::UpstreamUnavailable { .. } => StatusCode::BAD_GATEWAY,
                AuthError::TokenStorage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::MissingCredentials => "unauthenticated",
            Self::Auth(err) => err.code(),
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Auth(AuthError::Upstream {
                message: Some(message),
                ..
            }) => message.clone(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(status = status.as_u16(), error = %self, "Request failed");
        }
        let body = ErrorResponse {
            error: self.code().to_string(),
            message: self.message(),
        };
        (status, Json(body)).into_response()
    }
}

/// Errors that prevent the server from starting or keep it from serving.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An outbound adapter could not be built.
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    /// The frontend URL is not a valid CORS origin.
    #[error("invalid frontend origin: {0}")]
    InvalidOrigin(String),

    /// The listener could not be bound.
    #[error("failed to bind listener: {0}")]
    Bind(#[source] std::io::Error),

    /// The server stopped with an I/O error.
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}
