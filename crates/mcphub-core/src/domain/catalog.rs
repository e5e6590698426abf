//! Merged catalog types: tools, resources, prompts, templates.
//!
//! Payloads (tool arguments, contents, prompt messages) stay opaque
//! `serde_json::Value`s. The aggregation core is parametric over payload
//! shape; only the wire edges decode or encode.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tool definition from a child server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpTool {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// JSON Schema for input parameters.
    #[serde(default, rename = "inputSchema", skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
}

impl McpTool {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    #[must_use]
    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = Some(schema);
        self
    }
}

/// Resource definition from a child server.
///
/// In aggregated listings the `uri` is already rewritten to the
/// `resource://<serverName>/<path>` namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpResource {
    pub uri: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Resource template definition from a child server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpResourceTemplate {
    #[serde(rename = "uriTemplate")]
    pub uri_template: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Prompt definition from a child server.
///
/// In aggregated listings the `name` is already namespaced as
/// `<serverName>/<promptName>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpPrompt {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Prompt argument descriptors, passed through opaquely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

/// Result of a tool call, passed through from the child unmodified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// Content array (text/image/... items) exactly as the child returned it.
    pub content: Value,

    /// Whether the child flagged the result as an error payload.
    #[serde(default, rename = "isError")]
    pub is_error: bool,
}

impl ToolCallResult {
    pub const fn ok(content: Value) -> Self {
        Self {
            content,
            is_error: false,
        }
    }

    pub const fn error(content: Value) -> Self {
        Self {
            content,
            is_error: true,
        }
    }
}

/// Contents returned by a resource read.
///
/// An explicit empty list is a valid response, distinct from an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceContents {
    pub contents: Vec<Value>,
}

impl ResourceContents {
    pub const fn empty() -> Self {
        Self {
            contents: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
}
