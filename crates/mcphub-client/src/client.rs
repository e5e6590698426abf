//! High-level MCP client: a transport plus the initialize handshake and
//! typed wrappers for the catalog operations.

use async_trait::async_trait;
use mcphub_core::error::{ClientError, ConnectionError};
use mcphub_core::{McpConnection, McpPrompt, McpResource, McpResourceTemplate, McpTool, ToolCallResult};
use serde_json::{json, Value};

use crate::protocol::{InitializeResult, ServerCapabilities, ServerInfo, PROTOCOL_VERSION};
use crate::transport::Transport;

/// A connected, initialized MCP client for one child server.
pub struct McpClient {
    transport: Transport,
    server_info: Option<ServerInfo>,
    capabilities: ServerCapabilities,
}

impl McpClient {
    /// Spawn a stdio child and wrap it. Not yet initialized.
    pub fn spawn_stdio(
        command: &str,
        args: &[String],
        env: &[(String, String)],
    ) -> Result<Self, ConnectionError> {
        let transport = crate::transport::stdio::StdioTransport::spawn(command, args, env)?;
        Ok(Self::from_transport(Transport::Stdio(transport)))
    }

    /// Open an SSE stream to a remote server. Not yet initialized.
    pub async fn connect_sse(url: &str, bearer: Option<&str>) -> Result<Self, ConnectionError> {
        let transport = crate::transport::sse::SseTransport::connect(url, bearer).await?;
        Ok(Self::from_transport(Transport::Sse(transport)))
    }

    /// Set up a streamable HTTP session. Not yet initialized.
    pub fn connect_http(url: &str, bearer: Option<&str>) -> Result<Self, ConnectionError> {
        let transport = crate::transport::http::HttpTransport::new(url, bearer)?;
        Ok(Self::from_transport(Transport::Http(transport)))
    }

    fn from_transport(transport: Transport) -> Self {
        Self {
            transport,
            server_info: None,
            capabilities: ServerCapabilities::default(),
        }
    }

    /// Perform the MCP initialize handshake and record the server's
    /// identity and capabilities.
    pub async fn initialize(&mut self) -> Result<InitializeResult, ClientError> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "clientInfo": {
                "name": "mcphub",
                "version": env!("CARGO_PKG_VERSION"),
            },
            "capabilities": {},
        });

        let result = self.transport.request("initialize", Some(params)).await?;
        let init: InitializeResult = serde_json::from_value(result).map_err(|e| {
            ClientError::Connection(ConnectionError::new(format!(
                "invalid initialize result: {e}"
            )))
        })?;

        tracing::debug!(
            server = %init.server_info.name,
            version = init.server_info.version.as_deref().unwrap_or("unknown"),
            protocol = %init.protocol_version,
            "initialized MCP session"
        );

        self.server_info = Some(init.server_info.clone());
        self.capabilities = init.capabilities.clone();

        self.transport
            .notify("notifications/initialized", None)
            .await?;

        Ok(init)
    }

    /// Identity reported by the server during initialize, if completed.
    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.server_info.as_ref()
    }

    pub fn capabilities(&self) -> &ServerCapabilities {
        &self.capabilities
    }

    /// Deserialize a named array field out of a result object. A missing
    /// field reads as empty, matching servers that omit it.
    fn parse_list<T: serde::de::DeserializeOwned>(
        mut result: Value,
        field: &str,
    ) -> Result<Vec<T>, ClientError> {
        match result.get_mut(field).map(Value::take) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => serde_json::from_value(value).map_err(|e| {
                ClientError::Connection(ConnectionError::new(format!(
                    "invalid {field} in response: {e}"
                )))
            }),
        }
    }
}

#[async_trait]
impl McpConnection for McpClient {
    async fn list_tools(&self) -> Result<Vec<McpTool>, ClientError> {
        if self.capabilities.tools.is_none() {
            return Ok(Vec::new());
        }
        let result = self.transport.request("tools/list", None).await?;
        Self::parse_list(result, "tools")
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<ToolCallResult, ClientError> {
        let params = json!({ "name": name, "arguments": arguments });
        let result = self.transport.request("tools/call", Some(params)).await?;
        serde_json::from_value(result).map_err(|e| {
            ClientError::Connection(ConnectionError::new(format!(
                "invalid tool call result: {e}"
            )))
        })
    }

    async fn list_resources(&self) -> Result<Vec<McpResource>, ClientError> {
        if self.capabilities.resources.is_none() {
            return Ok(Vec::new());
        }
        let result = self.transport.request("resources/list", None).await?;
        Self::parse_list(result, "resources")
    }

    async fn read_resource(&self, uri: &str) -> Result<Vec<Value>, ClientError> {
        let params = json!({ "uri": uri });
        let result = self
            .transport
            .request("resources/read", Some(params))
            .await?;
        Self::parse_list(result, "contents")
    }

    async fn list_resource_templates(&self) -> Result<Vec<McpResourceTemplate>, ClientError> {
        if self.capabilities.resources.is_none() {
            return Ok(Vec::new());
        }
        let result = self
            .transport
            .request("resources/templates/list", None)
            .await?;
        Self::parse_list(result, "resourceTemplates")
    }

    async fn list_prompts(&self) -> Result<Vec<McpPrompt>, ClientError> {
        if self.capabilities.prompts.is_none() {
            return Ok(Vec::new());
        }
        let result = self.transport.request("prompts/list", None).await?;
        Self::parse_list(result, "prompts")
    }

    async fn get_prompt(
        &self,
        name: &str,
        arguments: Option<Value>,
    ) -> Result<Value, ClientError> {
        let mut params = json!({ "name": name });
        if let Some(arguments) = arguments {
            params["arguments"] = arguments;
        }
        self.transport.request("prompts/get", Some(params)).await
    }

    async fn shutdown(&self) {
        self.transport.shutdown().await;
    }
}
