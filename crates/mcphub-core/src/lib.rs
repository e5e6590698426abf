//! Core domain types and ports for mcphub.
//!
//! This crate defines the shared vocabulary of the gateway: child server
//! configuration, tokens, audit records, workspaces, the merged catalog
//! types, and the port traits that adapter crates implement. It has no
//! transport or storage dependencies.

pub mod domain;
pub mod error;
pub mod events;
pub mod ports;

pub use domain::audit::{
    AuditCursor, AuditPage, AuditRecord, AuditStats, CountBucket, NewAuditRecord, OperationKind,
    OperationStatus,
};
pub use domain::catalog::{
    McpPrompt, McpResource, McpResourceTemplate, McpTool, ResourceContents, ToolCallResult,
};
pub use domain::server::{
    EnvEntry, McpServer, NewMcpServer, ServerConfig, ServerStatus, TransportKind, UpdateMcpServer,
};
pub use domain::token::{ApiToken, NewApiToken};
pub use domain::workspace::{NewWorkspace, Workspace, WorkspaceKind};
pub use error::{AuthError, ClientError, ConnectionError, GatewayError};
pub use events::AppEvent;
pub use ports::{
    AppEventEmitter, AuditRepository, McpConnection, NoopEmitter, RepositoryError,
    ServerConnector, ServerRepository, TokenRepository, WorkspaceRepository,
};
