//! Transport implementations behind the MCP client.
//!
//! Each transport exposes the same two primitives: `request` (send one
//! JSON-RPC request, await its response) and `notify` (fire-and-forget).
//! Every failure is converted into a tagged error; nothing panics through.

pub(crate) mod http;
pub(crate) mod sse;
pub(crate) mod stdio;

use mcphub_core::error::ClientError;
use serde_json::Value;

/// Seconds to wait for a single response. Generous because `npx`-style
/// children can take a long time to come up.
pub(crate) const REQUEST_TIMEOUT_SECS: u64 = 30;

/// A connected transport to one child server.
pub(crate) enum Transport {
    Stdio(stdio::StdioTransport),
    Sse(sse::SseTransport),
    Http(http::HttpTransport),
}

impl Transport {
    pub async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, ClientError> {
        match self {
            Self::Stdio(t) => t.request(method, params).await,
            Self::Sse(t) => t.request(method, params).await,
            Self::Http(t) => t.request(method, params).await,
        }
    }

    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), ClientError> {
        match self {
            Self::Stdio(t) => t.notify(method, params).await,
            Self::Sse(t) => t.notify(method, params).await,
            Self::Http(t) => t.notify(method, params).await,
        }
    }

    pub async fn shutdown(&self) {
        match self {
            Self::Stdio(t) => t.shutdown(),
            Self::Sse(t) => t.shutdown(),
            Self::Http(t) => t.shutdown().await,
        }
    }
}
