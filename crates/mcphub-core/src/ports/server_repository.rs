//! Persistence port for child server configurations.

use async_trait::async_trait;

use super::RepositoryError;
use crate::domain::server::{McpServer, NewMcpServer};

/// CRUD over persisted child server configurations.
#[async_trait]
pub trait ServerRepository: Send + Sync {
    /// Insert a new server and return it with its assigned id.
    async fn insert(&self, server: NewMcpServer) -> Result<McpServer, RepositoryError>;

    async fn get_by_id(&self, id: i64) -> Result<McpServer, RepositoryError>;

    async fn get_by_name(&self, name: &str) -> Result<McpServer, RepositoryError>;

    /// List all servers ordered by name.
    async fn list(&self) -> Result<Vec<McpServer>, RepositoryError>;

    async fn update(&self, server: &McpServer) -> Result<(), RepositoryError>;

    async fn delete(&self, id: i64) -> Result<(), RepositoryError>;

    /// Persist the last start/connection error for a server.
    async fn set_last_error(
        &self,
        id: i64,
        error: Option<String>,
    ) -> Result<(), RepositoryError>;
}
