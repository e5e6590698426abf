//! Default `ServerConnector`: opens the configured transport and runs the
//! initialize handshake before handing the connection back.

use std::sync::Arc;

use async_trait::async_trait;
use mcphub_core::error::ConnectionError;
use mcphub_core::{McpConnection, McpServer, ServerConnector, TransportKind};

use crate::client::McpClient;

/// Connects to child servers over whichever transport they configure.
#[derive(Debug, Default, Clone, Copy)]
pub struct McpConnector;

impl McpConnector {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ServerConnector for McpConnector {
    async fn connect(&self, server: &McpServer) -> Result<Arc<dyn McpConnection>, ConnectionError> {
        server
            .config
            .validate(server.transport)
            .map_err(ConnectionError::new)?;

        let mut client = match server.transport {
            TransportKind::Stdio => {
                // validate() guarantees command is present for stdio.
                let command = server
                    .config
                    .command
                    .as_deref()
                    .ok_or_else(|| ConnectionError::new("stdio server requires a command"))?;
                let args = server.config.args.clone().unwrap_or_default();
                let env: Vec<(String, String)> = server
                    .env
                    .iter()
                    .map(|e| (e.key.clone(), e.value.clone()))
                    .collect();
                McpClient::spawn_stdio(command, &args, &env)?
            }
            TransportKind::Sse => {
                let url = server
                    .config
                    .url
                    .as_deref()
                    .ok_or_else(|| ConnectionError::new("remote server requires a url"))?;
                McpClient::connect_sse(url, server.config.bearer_token.as_deref()).await?
            }
            TransportKind::StreamableHttp => {
                let url = server
                    .config
                    .url
                    .as_deref()
                    .ok_or_else(|| ConnectionError::new("remote server requires a url"))?;
                McpClient::connect_http(url, server.config.bearer_token.as_deref())?
            }
        };

        if let Err(e) = client.initialize().await {
            client.shutdown().await;
            return Err(ConnectionError::new(format!(
                "initialize failed for '{}': {e}",
                server.name
            )));
        }

        Ok(Arc::new(client))
    }
}
