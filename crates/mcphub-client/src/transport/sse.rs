//! SSE transport: a long-lived event stream plus a companion POST endpoint.
//!
//! The server's first `endpoint` event names the URL to POST requests to;
//! responses arrive back on the event stream and are routed to waiting
//! callers by JSON-RPC id.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use mcphub_core::error::{ClientError, ConnectionError};
use serde_json::Value;
use tokio::sync::{oneshot, Mutex};
use tokio::time::timeout;

use crate::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use crate::transport::REQUEST_TIMEOUT_SECS;

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>>;

/// Transport over a long-lived SSE stream.
pub(crate) struct SseTransport {
    http: reqwest::Client,
    message_url: String,
    bearer: Option<String>,
    pending: PendingMap,
    request_id: AtomicU64,
    reader: tokio::task::JoinHandle<()>,
}

impl SseTransport {
    /// Open the event stream and wait for the `endpoint` event.
    pub async fn connect(url: &str, bearer: Option<&str>) -> Result<Self, ConnectionError> {
        let http = reqwest::Client::new();

        let mut request = http
            .get(url)
            .header(reqwest::header::ACCEPT, "text/event-stream");
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ConnectionError::new(format!("failed to open SSE stream: {e}")))?;

        if !response.status().is_success() {
            return Err(ConnectionError::new(format!(
                "SSE stream rejected with status {}",
                response.status()
            )));
        }

        let stream = response.bytes_stream();
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let (endpoint_tx, endpoint_rx) = oneshot::channel();
        let reader = tokio::spawn(read_loop(stream, endpoint_tx, Arc::clone(&pending)));

        let endpoint = match timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS), endpoint_rx).await
        {
            Ok(Ok(endpoint)) => endpoint,
            Ok(Err(_)) => {
                reader.abort();
                return Err(ConnectionError::new(
                    "SSE stream closed before the endpoint event",
                ));
            }
            Err(_) => {
                reader.abort();
                return Err(ConnectionError::new("timeout waiting for endpoint event"));
            }
        };

        let message_url = resolve_endpoint(url, &endpoint)?;

        Ok(Self {
            http,
            message_url,
            bearer: bearer.map(str::to_string),
            pending,
            request_id: AtomicU64::new(1),
            reader,
        })
    }

    pub async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, ClientError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest::new(id, method, params);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let body = serde_json::to_value(&request)
            .map_err(|e| ConnectionError::new(e.to_string()))?;
        if let Err(e) = self.post_json(body).await {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        let response = match timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS), rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => {
                return Err(ClientError::Connection(ConnectionError::new(
                    "SSE stream closed while waiting for response",
                )));
            }
            Err(_) => {
                self.pending.lock().await.remove(&id);
                return Err(ClientError::Connection(ConnectionError::new(
                    "timeout waiting for server response",
                )));
            }
        };

        response.into_result()
    }

    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), ClientError> {
        let notification = JsonRpcNotification::new(method, params);
        let body = serde_json::to_value(&notification)
            .map_err(|e| ConnectionError::new(e.to_string()))?;
        self.post_json(body).await
    }

    async fn post_json(&self, body: Value) -> Result<(), ClientError> {
        let mut post = self.http.post(&self.message_url).json(&body);
        if let Some(token) = &self.bearer {
            post = post.bearer_auth(token);
        }

        let response = post
            .send()
            .await
            .map_err(|e| ConnectionError::new(format!("failed to post message: {e}")))?;

        if !response.status().is_success() {
            return Err(ClientError::Connection(ConnectionError::new(format!(
                "message endpoint rejected with status {}",
                response.status()
            ))));
        }
        Ok(())
    }

    /// Abort the background reader. In-flight callers see a closed channel.
    pub fn shutdown(&self) {
        self.reader.abort();
    }
}

impl Drop for SseTransport {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Parse the raw SSE byte stream, routing events as they complete.
async fn read_loop<S>(mut stream: S, endpoint_tx: oneshot::Sender<String>, pending: PendingMap)
where
    S: futures_util::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Unpin + Send,
{
    let mut endpoint_tx = Some(endpoint_tx);
    let mut buffer = String::new();
    let mut event_name = String::new();
    let mut data = String::new();

    while let Some(chunk) = stream.next().await {
        let Ok(chunk) = chunk else { break };
        buffer.push_str(&String::from_utf8_lossy(&chunk));

        while let Some(pos) = buffer.find('\n') {
            let line = buffer[..pos].trim_end_matches('\r').to_string();
            buffer.drain(..=pos);

            if line.is_empty() {
                if !data.is_empty() {
                    dispatch_event(&event_name, &data, &mut endpoint_tx, &pending).await;
                }
                event_name.clear();
                data.clear();
            } else if let Some(rest) = line.strip_prefix("event:") {
                event_name = rest.trim().to_string();
            } else if let Some(rest) = line.strip_prefix("data:") {
                if !data.is_empty() {
                    data.push('\n');
                }
                data.push_str(rest.strip_prefix(' ').unwrap_or(rest));
            }
            // Comment and id lines are ignored.
        }
    }

    tracing::debug!("SSE stream ended");
}

async fn dispatch_event(
    event_name: &str,
    data: &str,
    endpoint_tx: &mut Option<oneshot::Sender<String>>,
    pending: &PendingMap,
) {
    if event_name == "endpoint" {
        if let Some(tx) = endpoint_tx.take() {
            let _ = tx.send(data.to_string());
        }
        return;
    }

    // Default event type is "message": a JSON-RPC response to route by id.
    match serde_json::from_str::<JsonRpcResponse>(data) {
        Ok(response) => {
            if let Some(id) = response.id {
                if let Some(tx) = pending.lock().await.remove(&id) {
                    let _ = tx.send(response);
                }
            }
        }
        Err(e) => {
            tracing::debug!(error = %e, "skipping unparseable SSE message");
        }
    }
}

/// Resolve a possibly-relative endpoint against the stream URL.
fn resolve_endpoint(base: &str, endpoint: &str) -> Result<String, ConnectionError> {
    let base = url::Url::parse(base)
        .map_err(|e| ConnectionError::new(format!("invalid SSE url: {e}")))?;
    let resolved = base
        .join(endpoint)
        .map_err(|e| ConnectionError::new(format!("invalid endpoint event: {e}")))?;
    Ok(resolved.to_string())
}
