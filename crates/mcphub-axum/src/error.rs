//! HTTP error mapping for the management API.
//!
//! Gateway errors map onto status codes here; the JSON-RPC endpoint has its
//! own error-code mapping in `rpc`. Authorization failures keep their
//! generic message so a 401 body never reveals which check failed.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mcphub_core::{GatewayError, RepositoryError};
use serde::Serialize;
use thiserror::Error;

/// Axum-specific error type.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad gateway: {0}")]
    BadGateway(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    status: u16,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Self::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            Self::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = ErrorBody {
            error: message,
            status: status.as_u16(),
        };
        (status, axum::Json(body)).into_response()
    }
}

impl From<GatewayError> for HttpError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Auth(auth) => Self::Unauthorized(auth.to_string()),
            GatewayError::UnknownTarget(msg) => Self::NotFound(msg),
            GatewayError::NotRunning(name) => Self::Conflict(format!("server not running: {name}")),
            GatewayError::Connection(conn) => Self::BadGateway(conn.to_string()),
            GatewayError::Downstream { code, message, .. } => {
                Self::BadGateway(format!("server error: code={code}, message={message}"))
            }
            GatewayError::Repository(repo) => repo.into(),
            GatewayError::InvalidParams(msg) => Self::BadRequest(msg),
            GatewayError::Unavailable(msg) => Self::ServiceUnavailable(msg),
        }
    }
}

impl From<RepositoryError> for HttpError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(msg) => Self::NotFound(msg),
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            RepositoryError::Internal(msg) => Self::Internal(format!("Storage: {msg}")),
        }
    }
}
