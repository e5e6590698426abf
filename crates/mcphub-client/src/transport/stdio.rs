//! Stdio transport: a spawned subprocess speaking line-delimited JSON-RPC.
//!
//! A background reader task owns the child's stdout and routes every
//! response line to the caller waiting on its JSON-RPC id, so concurrent
//! requests over one child never receive each other's results.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mcphub_core::error::{ClientError, ConnectionError};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{oneshot, Mutex};
use tokio::time::timeout;

use crate::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use crate::transport::REQUEST_TIMEOUT_SECS;

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>>;

/// Transport over a spawned child process's stdin/stdout.
pub(crate) struct StdioTransport {
    /// Child process handle, killed on shutdown.
    process: std::sync::Mutex<Option<Child>>,
    stdin: Mutex<ChildStdin>,
    pending: PendingMap,
    request_id: AtomicU64,
    reader: tokio::task::JoinHandle<()>,
}

impl StdioTransport {
    /// Spawn the child process with the parent environment merged with the
    /// explicit per-server variables. Explicit values win.
    pub fn spawn(
        command: &str,
        args: &[String],
        env: &[(String, String)],
    ) -> Result<Self, ConnectionError> {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        for (key, value) in env {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn().map_err(|e| {
            ConnectionError::new(format!(
                "failed to spawn '{command}': {e} (args: {args:?})"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ConnectionError::new("failed to capture child stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ConnectionError::new("failed to capture child stdout"))?;

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let reader = tokio::spawn(read_loop(stdout, Arc::clone(&pending)));

        Ok(Self {
            process: std::sync::Mutex::new(Some(child)),
            stdin: Mutex::new(stdin),
            pending,
            request_id: AtomicU64::new(1),
            reader,
        })
    }

    /// Send one request and wait for the response carrying its id.
    pub async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, ClientError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest::new(id, method, params);
        let line = serde_json::to_string(&request)
            .map_err(|e| ConnectionError::new(e.to_string()))?
            + "\n";

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        if let Err(e) = self.write_line(&line).await {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        let response = match timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS), rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => {
                return Err(ClientError::Connection(ConnectionError::new(
                    "server closed its stdout",
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

    /// Send a notification; no response is expected.
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), ClientError> {
        let notification = JsonRpcNotification::new(method, params);
        let line = serde_json::to_string(&notification)
            .map_err(|e| ConnectionError::new(e.to_string()))?
            + "\n";
        self.write_line(&line).await
    }

    async fn write_line(&self, line: &str) -> Result<(), ClientError> {
        let mut stdin = self.stdin.lock().await;
        if let Err(e) = stdin.write_all(line.as_bytes()).await {
            return Err(ClientError::Connection(ConnectionError::new(e.to_string())));
        }
        stdin
            .flush()
            .await
            .map_err(|e| ClientError::Connection(ConnectionError::new(e.to_string())))
    }

    /// Kill the child process. Best effort; in-flight callers see a closed
    /// channel.
    pub fn shutdown(&self) {
        self.reader.abort();
        if let Ok(mut guard) = self.process.lock() {
            if let Some(mut child) = guard.take() {
                let _ = child.start_kill();
            }
        }
    }
}

impl Drop for StdioTransport {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Read stdout lines, routing each response to its waiting caller by id.
/// Empty lines and non-JSON startup noise from npx-style launchers are
/// skipped; responses for ids nobody is waiting on are dropped.
async fn read_loop(stdout: ChildStdout, pending: PendingMap) {
    let mut lines = BufReader::new(stdout).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match serde_json::from_str::<JsonRpcResponse>(trimmed) {
                    // Lines without an id are server-side notifications.
                    Ok(response) => {
                        if let Some(id) = response.id {
                            if let Some(tx) = pending.lock().await.remove(&id) {
                                let _ = tx.send(response);
                            } else {
                                tracing::debug!(id, "dropping response with no waiting caller");
                            }
                        }
                    }
                    Err(_) => {
                        tracing::debug!(line = trimmed, "skipping non-JSON-RPC output");
                    }
                }
            }
            Ok(None) | Err(_) => break,
        }
    }

    // Waking every waiting caller: dropping the senders closes their
    // channels.
    pending.lock().await.clear();
    tracing::debug!("stdio stream ended");
}
