//! Child MCP server domain types.
//!
//! A child server is an independently running process or remote endpoint
//! that exposes tools/resources/prompts via MCP. The gateway persists its
//! configuration and tracks its runtime status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Transport used to reach a child server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
    /// Local subprocess speaking MCP over stdin/stdout.
    #[default]
    Stdio,
    /// Remote server reached over a long-lived event stream.
    Sse,
    /// Remote server reached over a bidirectional streamable HTTP session.
    StreamableHttp,
}

impl TransportKind {
    /// Stable string form used in the database and on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdio => "stdio",
            Self::Sse => "sse",
            Self::StreamableHttp => "streamable-http",
        }
    }

    /// Parse the stable string form. Unknown values default to stdio.
    pub fn parse(s: &str) -> Self {
        match s {
            "sse" => Self::Sse,
            "streamable-http" => Self::StreamableHttp,
            _ => Self::Stdio,
        }
    }
}

/// Runtime state of a child server.
///
/// Legal transitions: `stopped -> starting -> running -> stopping -> stopped`,
/// with `error` reachable from `starting` and from `running` on disconnect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    #[default]
    Stopped,
    Starting,
    Running,
    Stopping,
    Error(String),
}

impl ServerStatus {
    /// Whether the server currently holds (or is about to hold) a connection.
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Starting | Self::Running)
    }
}

/// Environment variable entry for stdio servers.
///
/// Values are stored base64-encoded in the database. This is encoding,
/// not encryption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvEntry {
    pub key: String,
    pub value: String,
}

impl EnvEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Transport parameters for a child server.
///
/// Stdio servers require `command`; remote servers require `url`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Executable name or path for stdio servers (flags go in `args`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Arguments passed to the executable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,

    /// URL for remote servers (SSE or streamable HTTP).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Bearer token attached to remote connections.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,
}

impl ServerConfig {
    /// Create a stdio server configuration.
    #[must_use]
    pub fn stdio(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: Some(command.into()),
            args: Some(args),
            url: None,
            bearer_token: None,
        }
    }

    /// Create a remote server configuration.
    #[must_use]
    pub fn remote(url: impl Into<String>, bearer_token: Option<String>) -> Self {
        Self {
            command: None,
            args: None,
            url: Some(url.into()),
            bearer_token,
        }
    }

    /// Validate required fields for the given transport.
    pub fn validate(&self, transport: TransportKind) -> Result<(), String> {
        match transport {
            TransportKind::Stdio => {
                let command = self
                    .command
                    .as_ref()
                    .ok_or_else(|| "stdio server requires a command".to_string())?;
                if command.is_empty() {
                    return Err("stdio server command cannot be empty".to_string());
                }
                if command.contains(char::is_whitespace) {
                    return Err(
                        "command must be an executable name/path only; put flags in 'args'"
                            .to_string(),
                    );
                }
                Ok(())
            }
            TransportKind::Sse | TransportKind::StreamableHttp => {
                let url = self
                    .url
                    .as_ref()
                    .ok_or_else(|| "remote server requires a url".to_string())?;
                if url.is_empty() {
                    return Err("remote server url cannot be empty".to_string());
                }
                Ok(())
            }
        }
    }
}

/// A persisted child server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServer {
    /// Stable database id.
    pub id: i64,

    /// Display name, unique within a workspace. Used as the external
    /// namespace segment for resources and prompts.
    pub name: String,

    /// Transport used to reach the server.
    pub transport: TransportKind,

    /// Transport parameters.
    pub config: ServerConfig,

    /// Whether the server participates in aggregation at all.
    pub enabled: bool,

    /// Whether the server is started eagerly when the registry loads.
    pub auto_start: bool,

    /// Environment variables for stdio servers. Explicit values win over
    /// the inherited parent environment.
    pub env: Vec<EnvEntry>,

    /// When the configuration was added.
    pub created_at: DateTime<Utc>,

    /// Last start/connection error, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// A child server configuration that has not been persisted yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMcpServer {
    pub name: String,
    pub transport: TransportKind,
    pub config: ServerConfig,
    pub enabled: bool,
    pub auto_start: bool,
    pub env: Vec<EnvEntry>,
}

impl NewMcpServer {
    /// Create a new stdio-based server.
    #[must_use]
    pub fn stdio(name: impl Into<String>, command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            transport: TransportKind::Stdio,
            config: ServerConfig::stdio(command, args),
            enabled: true,
            auto_start: false,
            env: Vec::new(),
        }
    }

    /// Create a new SSE-based server.
    #[must_use]
    pub fn sse(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transport: TransportKind::Sse,
            config: ServerConfig::remote(url, None),
            enabled: true,
            auto_start: false,
            env: Vec::new(),
        }
    }

    /// Create a new streamable-HTTP server.
    #[must_use]
    pub fn streamable_http(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transport: TransportKind::StreamableHttp,
            config: ServerConfig::remote(url, None),
            enabled: true,
            auto_start: false,
            env: Vec::new(),
        }
    }

    /// Add an environment variable.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push(EnvEntry::new(key, value));
        self
    }

    /// Set auto-start.
    #[must_use]
    pub const fn with_auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }

    /// Set enabled status.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the bearer token for a remote server.
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.config.bearer_token = Some(token.into());
        self
    }
}

/// Partial update of an existing server. Only provided fields change.
///
/// Updating does not restart a running connection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMcpServer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<TransportKind>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<ServerConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_start: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<Vec<EnvEntry>>,
}

impl UpdateMcpServer {
    /// Apply this partial update to an existing server.
    pub fn apply_to(&self, server: &mut McpServer) {
        if let Some(ref name) = self.name {
            server.name.clone_from(name);
        }
        if let Some(transport) = self.transport {
            server.transport = transport;
        }
        if let Some(ref config) = self.config {
            server.config = config.clone();
        }
        if let Some(enabled) = self.enabled {
            server.enabled = enabled;
        }
        if let Some(auto_start) = self.auto_start {
            server.auto_start = auto_start;
        }
        if let Some(ref env) = self.env {
            server.env.clone_from(env);
        }
    }
}
