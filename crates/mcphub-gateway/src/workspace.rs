//! Workspace switch coordination.
//!
//! Exactly one workspace is active at a time. A switch tears down the live
//! service bundle, reopens everything against the target store and installs
//! the new bundle. Switches are exclusive; while one is in flight, the
//! context's services slot is empty and aggregated calls are rejected. A
//! switch that fails before the new store opens leaves the prior workspace
//! running.

use std::sync::Arc;

use mcphub_core::{
    AppEvent, AppEventEmitter, GatewayError, NewWorkspace, RepositoryError, Workspace,
    WorkspaceKind, WorkspaceRepository,
};
use tokio::sync::Mutex;

use crate::context::AppContext;

/// Coordinates the workspace registry and the active service bundle.
pub struct WorkspaceCoordinator {
    workspaces: Arc<dyn WorkspaceRepository>,
    context: Arc<AppContext>,
    emitter: Arc<dyn AppEventEmitter>,
    switch_lock: Mutex<()>,
}

impl WorkspaceCoordinator {
    pub fn new(
        workspaces: Arc<dyn WorkspaceRepository>,
        context: Arc<AppContext>,
        emitter: Arc<dyn AppEventEmitter>,
    ) -> Self {
        Self {
            workspaces,
            context,
            emitter,
            switch_lock: Mutex::new(()),
        }
    }

    pub async fn list(&self) -> Result<Vec<Workspace>, GatewayError> {
        Ok(self.workspaces.list().await?)
    }

    pub async fn active(&self) -> Result<Option<Workspace>, GatewayError> {
        Ok(self.workspaces.active().await?)
    }

    pub async fn create(&self, new: NewWorkspace) -> Result<Workspace, GatewayError> {
        let workspace = self.workspaces.insert(new).await?;
        tracing::info!(workspace_name = %workspace.name, "Registered workspace");
        Ok(workspace)
    }

    /// Remove a workspace registration. The active workspace cannot be
    /// removed; switch away first.
    pub async fn remove(&self, id: i64) -> Result<(), GatewayError> {
        let workspace = self.get(id).await?;
        if workspace.active {
            return Err(GatewayError::InvalidParams(
                "cannot remove the active workspace".to_string(),
            ));
        }
        self.workspaces.delete(id).await?;
        Ok(())
    }

    /// Open the active workspace's services at startup.
    pub async fn open_active(&self) -> Result<Workspace, GatewayError> {
        let _guard = self.switch_lock.lock().await;
        let Some(active) = self.workspaces.active().await? else {
            return Err(GatewayError::Unavailable(
                "no active workspace".to_string(),
            ));
        };
        ensure_openable(&active)?;
        self.open_workspace(&active).await?;
        Ok(active)
    }

    /// Switch the gateway to another workspace.
    ///
    /// Running children stop under the outgoing workspace so their shutdown
    /// trail lands in its store. If the target store fails to open, the
    /// prior workspace is reopened and stays active.
    pub async fn switch(&self, id: i64) -> Result<Workspace, GatewayError> {
        let _guard = self.switch_lock.lock().await;

        let mut target = self.get(id).await?;
        if target.active {
            return Ok(target);
        }
        // Reject before tearing anything down.
        ensure_openable(&target)?;

        let previous = self.workspaces.active().await?;

        // The services slot stays empty from here until the new bundle
        // installs; concurrent aggregated calls see `Unavailable`.
        if let Some(services) = self.context.take().await {
            services.registry.stop_all().await;
        }

        if let Err(err) = self.open_workspace(&target).await {
            tracing::error!(
                workspace_name = %target.name,
                error = %err,
                "Workspace switch aborted"
            );
            if let Some(previous) = previous {
                if let Err(restore_err) = self.open_workspace(&previous).await {
                    tracing::error!(
                        workspace_name = %previous.name,
                        error = %restore_err,
                        "Failed to reopen previous workspace"
                    );
                }
            }
            return Err(err);
        }

        self.workspaces.set_active(id).await?;
        target.active = true;
        self.emitter
            .emit(AppEvent::workspace_switched(id, target.name.clone()));
        tracing::info!(workspace_name = %target.name, "Switched workspace");
        Ok(target)
    }

    async fn get(&self, id: i64) -> Result<Workspace, GatewayError> {
        match self.workspaces.get(id).await {
            Ok(workspace) => Ok(workspace),
            Err(RepositoryError::NotFound(_)) => {
                Err(GatewayError::UnknownTarget(format!("workspace: {id}")))
            }
            Err(other) => Err(GatewayError::Repository(other)),
        }
    }

    /// Build, resync and install services over one workspace's store, then
    /// auto-start its enabled servers.
    async fn open_workspace(&self, workspace: &Workspace) -> Result<(), GatewayError> {
        let services = self.context.open(&workspace.store).await?;
        services.resync_token_grants().await?;
        self.context.install(services.clone()).await;
        services.registry.load().await?;
        Ok(())
    }
}

/// Only local stores can be opened; a remote store needs a backend this
/// build does not ship.
fn ensure_openable(workspace: &Workspace) -> Result<(), GatewayError> {
    if workspace.kind == WorkspaceKind::Remote {
        return Err(GatewayError::InvalidParams(format!(
            "workspace '{}' uses a remote store and cannot be opened",
            workspace.name
        )));
    }
    Ok(())
}
