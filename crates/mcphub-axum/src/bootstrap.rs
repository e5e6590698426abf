//! Composition root: wires SQLite storage, the MCP connector and the HTTP
//! layer into a runnable gateway.
//!
//! The binary crate stays a thin CLI over [`serve`]; tests build the same
//! state through [`build_state`] against a temp directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use mcphub_client::McpConnector;
use mcphub_core::{
    GatewayError, NewWorkspace, RepositoryError, WorkspaceKind, WorkspaceRepository,
};
use mcphub_db::{
    setup_database, setup_registry_database, SqliteAuditRepository, SqliteServerRepository,
    SqliteTokenRepository, SqliteWorkspaceRepository,
};
use mcphub_gateway::{AppContext, StoreOpener, Stores, WorkspaceCoordinator};

use crate::events::SseBroadcaster;
use crate::routes::create_router;
use crate::sessions::SessionManager;
use crate::state::AppState;

/// Server configuration from the CLI.
#[derive(Debug, Clone)]
pub struct ServeConfig {
    /// Directory holding the workspace registry and local store files.
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
}

/// Opens per-workspace SQLite stores. Relative store locators resolve
/// against the data directory.
pub struct SqliteStoreOpener {
    data_dir: PathBuf,
}

impl SqliteStoreOpener {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn resolve(&self, store: &str) -> PathBuf {
        let path = Path::new(store);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }
}

#[async_trait]
impl StoreOpener for SqliteStoreOpener {
    async fn open(&self, store: &str) -> Result<Stores, GatewayError> {
        let path = self.resolve(store);
        let pool = setup_database(&path).await.map_err(|err| {
            GatewayError::Repository(RepositoryError::Internal(format!(
                "failed to open store {}: {err}",
                path.display()
            )))
        })?;

        Ok(Stores {
            servers: Arc::new(SqliteServerRepository::new(pool.clone())),
            tokens: Arc::new(SqliteTokenRepository::new(pool.clone())),
            audit: Arc::new(SqliteAuditRepository::new(pool)),
        })
    }
}

/// Build the full application state: registry database, default workspace
/// on first run, active workspace opened and auto-started.
pub async fn build_state(config: &ServeConfig) -> Result<AppState> {
    let registry_pool = setup_registry_database(&config.data_dir.join("workspaces.db"))
        .await
        .context("failed to open workspace registry")?;
    let workspaces: Arc<dyn WorkspaceRepository> =
        Arc::new(SqliteWorkspaceRepository::new(registry_pool));

    if workspaces.list().await?.is_empty() {
        let workspace = workspaces
            .insert(NewWorkspace {
                name: "default".to_string(),
                kind: WorkspaceKind::Local,
                store: "default.db".to_string(),
            })
            .await?;
        workspaces.set_active(workspace.id).await?;
        tracing::info!("Registered default workspace");
    }

    let events = Arc::new(SseBroadcaster::with_defaults());
    let context = Arc::new(AppContext::new(
        Arc::new(McpConnector::new()),
        events.clone(),
        Arc::new(SqliteStoreOpener::new(config.data_dir.clone())),
    ));
    let coordinator = Arc::new(WorkspaceCoordinator::new(
        workspaces,
        context.clone(),
        events.clone(),
    ));

    let active = coordinator
        .open_active()
        .await
        .context("failed to open active workspace")?;
    tracing::info!(workspace_name = %active.name, "Opened workspace");

    Ok(AppState {
        context,
        workspaces: coordinator,
        events,
        sessions: Arc::new(SessionManager::default()),
    })
}

/// Run the gateway until the process is stopped.
pub async fn serve(config: ServeConfig) -> Result<()> {
    let state = build_state(&config).await?;
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?;
    tracing::info!(addr = %listener.local_addr()?, "mcphub listening");

    axum::serve(listener, router).await?;
    Ok(())
}
