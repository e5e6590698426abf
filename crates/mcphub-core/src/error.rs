//! Gateway error taxonomy.
//!
//! Transport failures are tagged results (`ConnectionError`), never panics.
//! Authorization failures all render the same generic external message so
//! callers cannot distinguish which check failed. Downstream errors from a
//! child server are passed through unmodified.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ports::RepositoryError;

/// A transport-level failure, always returned as a tagged result.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("connection error: {message}")]
pub struct ConnectionError {
    pub message: String,
}

impl ConnectionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors from talking to one child server.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure (spawn, connect, I/O, timeout).
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// The child's own JSON-RPC error payload, passed through unmodified.
    #[error("server error: code={code}, message={message}")]
    Downstream {
        code: i64,
        message: String,
        data: Option<serde_json::Value>,
    },
}

/// An authorization failure.
///
/// Every rejection path (missing token, unknown token, unknown server name,
/// out-of-scope server) displays the same generic message. The internal
/// reason is only for tracing.
#[derive(Debug, Clone, Error)]
#[error("invalid request")]
pub struct AuthError {
    reason: &'static str,
}

impl AuthError {
    pub const fn missing_token() -> Self {
        Self {
            reason: "missing token",
        }
    }

    pub const fn unknown_token() -> Self {
        Self {
            reason: "unknown token",
        }
    }

    pub const fn unknown_server() -> Self {
        Self {
            reason: "unknown server name",
        }
    }

    pub const fn out_of_scope() -> Self {
        Self {
            reason: "server not granted to token",
        }
    }

    /// Internal reason, for logs only. Never expose to clients.
    pub const fn reason(&self) -> &'static str {
        self.reason
    }
}

/// Errors surfaced by aggregated gateway operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Missing/invalid/out-of-scope token. Uniform external message.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Unresolvable server, tool or prompt name.
    #[error("unknown target: {0}")]
    UnknownTarget(String),

    /// The target server exists but is not running.
    #[error("server not running: {0}")]
    NotRunning(String),

    /// Transport failure reaching a child.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// The child's own error payload, passed through unmodified.
    #[error("server error: code={code}, message={message}")]
    Downstream {
        code: i64,
        message: String,
        data: Option<serde_json::Value>,
    },

    /// Configuration/audit persistence failure. Propagated, not swallowed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Malformed request parameters (e.g. a prompt name with no separator).
    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// The gateway is mid workspace switch; no new calls are authorized.
    #[error("gateway unavailable: {0}")]
    Unavailable(String),
}

impl From<ClientError> for GatewayError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Connection(e) => Self::Connection(e),
            ClientError::Downstream {
                code,
                message,
                data,
            } => Self::Downstream {
                code,
                message,
                data,
            },
        }
    }
}
