//! Persistence port for the workspace registry.

use async_trait::async_trait;

use super::RepositoryError;
use crate::domain::workspace::{NewWorkspace, Workspace};

/// Registry of workspaces and the single active flag.
#[async_trait]
pub trait WorkspaceRepository: Send + Sync {
    async fn insert(&self, workspace: NewWorkspace) -> Result<Workspace, RepositoryError>;

    async fn get(&self, id: i64) -> Result<Workspace, RepositoryError>;

    async fn list(&self) -> Result<Vec<Workspace>, RepositoryError>;

    /// The currently active workspace, if any.
    async fn active(&self) -> Result<Option<Workspace>, RepositoryError>;

    /// Mark `id` active and clear the flag everywhere else, atomically.
    async fn set_active(&self, id: i64) -> Result<(), RepositoryError>;

    async fn delete(&self, id: i64) -> Result<(), RepositoryError>;
}
