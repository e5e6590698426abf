//! Streamable HTTP transport: one JSON-RPC envelope per POST.
//!
//! The server may assign a session via the `Mcp-Session-Id` response header
//! on initialize; once seen, the id is echoed on every subsequent request.
//! Responses come back either as plain JSON or as a single SSE-framed
//! message, depending on the server.

use std::sync::atomic::{AtomicU64, Ordering};

use mcphub_core::error::{ClientError, ConnectionError};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

const SESSION_HEADER: &str = "mcp-session-id";

/// Transport over a streamable HTTP session.
pub(crate) struct HttpTransport {
    http: reqwest::Client,
    url: String,
    bearer: Option<String>,
    session_id: RwLock<Option<String>>,
    request_id: AtomicU64,
}

impl HttpTransport {
    pub fn new(url: &str, bearer: Option<&str>) -> Result<Self, ConnectionError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(
                crate::transport::REQUEST_TIMEOUT_SECS,
            ))
            .build()
            .map_err(|e| ConnectionError::new(e.to_string()))?;

        Ok(Self {
            http,
            url: url.to_string(),
            bearer: bearer.map(str::to_string),
            session_id: RwLock::new(None),
            request_id: AtomicU64::new(1),
        })
    }

    pub async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, ClientError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest::new(id, method, params);

        let response = self
            .send(serde_json::to_value(&request).map_err(|e| ConnectionError::new(e.to_string()))?)
            .await?;

        // Capture the session id the server may have assigned.
        if let Some(session) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            let mut guard = self.session_id.write().await;
            if guard.as_deref() != Some(session) {
                *guard = Some(session.to_string());
            }
        }

        if !response.status().is_success() {
            return Err(ClientError::Connection(ConnectionError::new(format!(
                "server rejected request with status {}",
                response.status()
            ))));
        }

        let is_event_stream = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));

        let body = response
            .text()
            .await
            .map_err(|e| ConnectionError::new(e.to_string()))?;

        let payload = if is_event_stream {
            extract_sse_data(&body).ok_or_else(|| {
                ConnectionError::new("event-stream response carried no data")
            })?
        } else {
            body
        };

        let parsed: JsonRpcResponse = serde_json::from_str(&payload)
            .map_err(|e| ConnectionError::new(format!("invalid JSON-RPC response: {e}")))?;
        parsed.into_result()
    }

    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), ClientError> {
        let notification = JsonRpcNotification::new(method, params);
        let body = serde_json::to_value(&notification)
            .map_err(|e| ConnectionError::new(e.to_string()))?;
        let response = self.send(body).await?;

        if !response.status().is_success() {
            return Err(ClientError::Connection(ConnectionError::new(format!(
                "server rejected notification with status {}",
                response.status()
            ))));
        }
        Ok(())
    }

    async fn send(&self, body: Value) -> Result<reqwest::Response, ClientError> {
        let mut post = self
            .http
            .post(&self.url)
            .header(
                reqwest::header::ACCEPT,
                "application/json, text/event-stream",
            )
            .json(&body);

        if let Some(token) = &self.bearer {
            post = post.bearer_auth(token);
        }
        if let Some(session) = self.session_id.read().await.as_deref() {
            post = post.header(SESSION_HEADER, session);
        }

        post.send()
            .await
            .map_err(|e| ClientError::Connection(ConnectionError::new(e.to_string())))
    }

    /// End the session. Best effort; servers without session support 405.
    pub async fn shutdown(&self) {
        let session = self.session_id.read().await.clone();
        if let Some(session) = session {
            let mut delete = self.http.delete(&self.url).header(SESSION_HEADER, session);
            if let Some(token) = &self.bearer {
                delete = delete.bearer_auth(token);
            }
            let _ = delete.send().await;
        }
    }
}

/// Concatenate the data lines of the first SSE event in `body`.
fn extract_sse_data(body: &str) -> Option<String> {
    let mut data = String::new();
    for line in body.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            if !data.is_empty() {
                break;
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    if data.is_empty() {
        None
    } else {
        Some(data)
    }
}
