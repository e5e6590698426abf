//! Port traits implemented by adapter crates.

mod audit_repository;
mod connection;
mod error;
mod event_emitter;
mod server_repository;
mod token_repository;
mod workspace_repository;

pub use audit_repository::AuditRepository;
pub use connection::{McpConnection, ServerConnector};
pub use error::RepositoryError;
pub use event_emitter::{AppEventEmitter, NoopEmitter};
pub use server_repository::ServerRepository;
pub use token_repository::TokenRepository;
pub use workspace_repository::WorkspaceRepository;
