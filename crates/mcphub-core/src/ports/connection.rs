//! Connection ports between the registry and the transport layer.
//!
//! `McpConnection` is the uniform client handle the registry stores for a
//! running child; `ServerConnector` opens one. Both are traits so the
//! aggregation core can be exercised against fake children in tests.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::catalog::{
    McpPrompt, McpResource, McpResourceTemplate, McpTool, ToolCallResult,
};
use crate::domain::server::McpServer;
use crate::error::{ClientError, ConnectionError};

/// A live, initialized connection to one child server.
#[async_trait]
pub trait McpConnection: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<McpTool>, ClientError>;

    /// Call a tool by its original (unprefixed) name.
    async fn call_tool(&self, name: &str, arguments: Value)
        -> Result<ToolCallResult, ClientError>;

    async fn list_resources(&self) -> Result<Vec<McpResource>, ClientError>;

    /// Read a resource by the literal URI given. Returns the contents list,
    /// which may legitimately be empty.
    async fn read_resource(&self, uri: &str) -> Result<Vec<Value>, ClientError>;

    async fn list_resource_templates(&self) -> Result<Vec<McpResourceTemplate>, ClientError>;

    async fn list_prompts(&self) -> Result<Vec<McpPrompt>, ClientError>;

    /// Get a prompt by its original (unprefixed) name.
    async fn get_prompt(
        &self,
        name: &str,
        arguments: Option<Value>,
    ) -> Result<Value, ClientError>;

    /// Close the connection. Best effort; never fails.
    async fn shutdown(&self);
}

/// Opens a connection to one child server over its configured transport.
///
/// Any transport error is converted into a tagged `ConnectionError`; the
/// caller never sees a panic or an untyped failure.
#[async_trait]
pub trait ServerConnector: Send + Sync {
    async fn connect(
        &self,
        server: &McpServer,
    ) -> Result<Arc<dyn McpConnection>, ConnectionError>;
}
