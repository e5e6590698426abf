//! Child server lifecycle management.
//!
//! The registry owns configuration and runtime status for every configured
//! child server, drives start/stop through the injected connector, and
//! exposes the name->id lookup map the rest of the gateway resolves against.
//!
//! Per-server state machine: `stopped -> starting -> running -> stopping ->
//! stopped`, with `error` reachable from `starting`. Concurrent starts for
//! one id converge on a single in-flight attempt; later callers wait on the
//! `starting` state instead of opening a duplicate connection.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use mcphub_core::{
    AppEvent, AppEventEmitter, GatewayError, McpConnection, McpServer, NewMcpServer,
    RepositoryError, ServerConnector, ServerRepository, ServerStatus, TokenRepository,
    UpdateMcpServer,
};
use tokio::sync::RwLock;

/// How long a caller waits on another caller's in-flight start.
const START_WAIT_TIMEOUT: Duration = Duration::from_secs(10);
const START_WAIT_POLL: Duration = Duration::from_millis(100);

/// Runtime entry for one configured server.
#[derive(Default)]
struct RuntimeEntry {
    status: ServerStatus,
    connection: Option<Arc<dyn McpConnection>>,
}

/// Outcome of trying to claim the start of one server.
enum StartClaim {
    /// This caller owns the connection attempt.
    Owner,
    /// Already running with a live handle; start is a no-op.
    AlreadyRunning,
    /// Another caller is mid-start; wait for its outcome.
    InFlight,
}

/// Registry of configured child servers and their runtime state.
pub struct ServerRegistry {
    repository: Arc<dyn ServerRepository>,
    tokens: Arc<dyn TokenRepository>,
    connector: Arc<dyn ServerConnector>,
    emitter: Arc<dyn AppEventEmitter>,
    runtime: RwLock<HashMap<i64, RuntimeEntry>>,
    /// name -> id, kept atomic with config writes.
    names: RwLock<HashMap<String, i64>>,
}

impl ServerRegistry {
    pub fn new(
        repository: Arc<dyn ServerRepository>,
        tokens: Arc<dyn TokenRepository>,
        connector: Arc<dyn ServerConnector>,
        emitter: Arc<dyn AppEventEmitter>,
    ) -> Self {
        Self {
            repository,
            tokens,
            connector,
            emitter,
            runtime: RwLock::new(HashMap::new()),
            names: RwLock::new(HashMap::new()),
        }
    }

    /// Load configurations and eagerly start enabled auto-start servers.
    ///
    /// Start failures are logged and isolated; one broken server does not
    /// block the rest from loading.
    pub async fn load(&self) -> Result<(), GatewayError> {
        let servers = self.repository.list().await?;

        {
            let mut names = self.names.write().await;
            let mut runtime = self.runtime.write().await;
            names.clear();
            for server in &servers {
                names.insert(server.name.clone(), server.id);
                runtime.entry(server.id).or_default();
            }
        }

        for server in servers {
            if server.auto_start && server.enabled {
                if let Err(e) = self.start(server.id).await {
                    tracing::warn!(
                        server_name = %server.name,
                        error = %e,
                        "Failed to auto-start server"
                    );
                }
            }
        }

        Ok(())
    }

    // =========================================================================
    // Configuration CRUD
    // =========================================================================

    /// Add a new server configuration. The new id is granted to every
    /// existing token so clients gain access predictably.
    pub async fn add_server(&self, new_server: NewMcpServer) -> Result<McpServer, GatewayError> {
        new_server
            .config
            .validate(new_server.transport)
            .map_err(GatewayError::InvalidParams)?;

        let saved = self.repository.insert(new_server).await?;

        {
            let mut names = self.names.write().await;
            let mut runtime = self.runtime.write().await;
            names.insert(saved.name.clone(), saved.id);
            runtime.entry(saved.id).or_default();
        }

        self.tokens.grant_to_all(saved.id).await?;

        self.emitter
            .emit(AppEvent::server_added(saved.id, saved.name.clone()));
        tracing::info!(server_name = %saved.name, "Added server configuration");

        Ok(saved)
    }

    pub async fn get_server(&self, id: i64) -> Result<McpServer, GatewayError> {
        self.repository.get_by_id(id).await.map_err(unknown_target)
    }

    pub async fn list_servers(&self) -> Result<Vec<McpServer>, GatewayError> {
        Ok(self.repository.list().await?)
    }

    /// Apply a partial update. The name->id map changes atomically with the
    /// config write; a running connection is not restarted.
    pub async fn update_server(
        &self,
        id: i64,
        update: UpdateMcpServer,
    ) -> Result<McpServer, GatewayError> {
        let mut server = self.repository.get_by_id(id).await.map_err(unknown_target)?;
        let old_name = server.name.clone();
        update.apply_to(&mut server);

        server
            .config
            .validate(server.transport)
            .map_err(GatewayError::InvalidParams)?;

        // Hold the name map across the write so readers never observe the
        // new config under the old name or vice versa.
        let mut names = self.names.write().await;
        self.repository.update(&server).await?;
        if old_name != server.name {
            names.remove(&old_name);
            names.insert(server.name.clone(), id);
        }
        drop(names);

        tracing::info!(server_name = %server.name, "Updated server configuration");
        Ok(server)
    }

    /// Remove a server: stop it if running, delete config and runtime entry,
    /// and strip its id from every token's grant list.
    pub async fn remove_server(&self, id: i64) -> Result<(), GatewayError> {
        let server = self.repository.get_by_id(id).await.map_err(unknown_target)?;

        self.stop(id).await?;

        self.repository.delete(id).await?;
        {
            let mut names = self.names.write().await;
            let mut runtime = self.runtime.write().await;
            names.remove(&server.name);
            runtime.remove(&id);
        }

        self.tokens.revoke_from_all(id).await?;

        self.emitter.emit(AppEvent::server_removed(id));
        tracing::info!(server_name = %server.name, "Removed server configuration");

        Ok(())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Start a server. No-op if already running; waits on a concurrent
    /// caller's in-flight start rather than double-starting.
    pub async fn start(&self, id: i64) -> Result<(), GatewayError> {
        let server = self.repository.get_by_id(id).await.map_err(unknown_target)?;

        if !server.enabled {
            return Err(GatewayError::InvalidParams(format!(
                "server '{}' is disabled",
                server.name
            )));
        }

        match self.claim_start(id).await {
            StartClaim::AlreadyRunning => Ok(()),
            StartClaim::InFlight => self.wait_for_start(id, &server.name).await,
            StartClaim::Owner => self.connect_claimed(&server).await,
        }
    }

    async fn claim_start(&self, id: i64) -> StartClaim {
        let mut runtime = self.runtime.write().await;
        let entry = runtime.entry(id).or_default();
        match entry.status {
            ServerStatus::Running if entry.connection.is_some() => StartClaim::AlreadyRunning,
            ServerStatus::Starting => StartClaim::InFlight,
            _ => {
                entry.status = ServerStatus::Starting;
                entry.connection = None;
                StartClaim::Owner
            }
        }
    }

    /// Poll until a concurrent start attempt settles.
    async fn wait_for_start(&self, id: i64, name: &str) -> Result<(), GatewayError> {
        let deadline = tokio::time::Instant::now() + START_WAIT_TIMEOUT;

        loop {
            tokio::time::sleep(START_WAIT_POLL).await;

            let status = self.status(id).await;
            match status {
                ServerStatus::Running => return Ok(()),
                ServerStatus::Error(message) => {
                    return Err(GatewayError::Connection(
                        mcphub_core::ConnectionError::new(message),
                    ));
                }
                ServerStatus::Starting => {
                    if tokio::time::Instant::now() >= deadline {
                        return Err(GatewayError::Connection(
                            mcphub_core::ConnectionError::new(format!(
                                "timed out waiting for '{name}' to start"
                            )),
                        ));
                    }
                }
                // The in-flight start was torn down underneath us.
                _ => {
                    return Err(GatewayError::Connection(
                        mcphub_core::ConnectionError::new(format!("start of '{name}' aborted")),
                    ));
                }
            }
        }
    }

    /// Run the connection attempt after claiming the `starting` slot.
    async fn connect_claimed(&self, server: &McpServer) -> Result<(), GatewayError> {
        match self.connector.connect(server).await {
            Ok(connection) => {
                {
                    let mut runtime = self.runtime.write().await;
                    let entry = runtime.entry(server.id).or_default();
                    entry.status = ServerStatus::Running;
                    entry.connection = Some(connection);
                }

                if let Err(e) = self.repository.set_last_error(server.id, None).await {
                    tracing::warn!(server_id = server.id, error = %e, "Failed to clear last error");
                }

                self.emitter
                    .emit(AppEvent::server_started(server.id, server.name.clone()));
                tracing::info!(server_name = %server.name, "Server started");
                Ok(())
            }
            Err(e) => {
                {
                    let mut runtime = self.runtime.write().await;
                    let entry = runtime.entry(server.id).or_default();
                    entry.status = ServerStatus::Error(e.message.clone());
                    entry.connection = None;
                }

                if let Err(store_err) = self
                    .repository
                    .set_last_error(server.id, Some(e.message.clone()))
                    .await
                {
                    tracing::warn!(server_id = server.id, error = %store_err, "Failed to record last error");
                }

                self.emitter.emit(AppEvent::server_error(
                    Some(server.id),
                    server.name.clone(),
                    e.message.clone(),
                ));
                tracing::warn!(server_name = %server.name, error = %e, "Server failed to start");
                Err(GatewayError::Connection(e))
            }
        }
    }

    /// Stop a server. Best-effort and idempotent: the state ends `stopped`
    /// even if closing the handle fails.
    pub async fn stop(&self, id: i64) -> Result<(), GatewayError> {
        let server = self.repository.get_by_id(id).await.map_err(unknown_target)?;

        let connection = {
            let mut runtime = self.runtime.write().await;
            let entry = runtime.entry(id).or_default();
            if entry.connection.is_none() && entry.status == ServerStatus::Stopped {
                return Ok(());
            }
            entry.status = ServerStatus::Stopping;
            entry.connection.take()
        };

        if let Some(connection) = connection {
            connection.shutdown().await;
        }

        {
            let mut runtime = self.runtime.write().await;
            let entry = runtime.entry(id).or_default();
            entry.status = ServerStatus::Stopped;
        }

        self.emitter
            .emit(AppEvent::server_stopped(id, server.name.clone()));
        tracing::info!(server_name = %server.name, "Server stopped");

        Ok(())
    }

    /// Stop every running server. Used at shutdown and on workspace switch.
    pub async fn stop_all(&self) {
        let ids: Vec<i64> = {
            let runtime = self.runtime.read().await;
            runtime
                .iter()
                .filter(|(_, entry)| entry.connection.is_some())
                .map(|(id, _)| *id)
                .collect()
        };

        for id in ids {
            if let Err(e) = self.stop(id).await {
                tracing::warn!(server_id = id, error = %e, "Failed to stop server");
            }
        }
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub async fn status(&self, id: i64) -> ServerStatus {
        let runtime = self.runtime.read().await;
        runtime
            .get(&id)
            .map(|entry| entry.status.clone())
            .unwrap_or_default()
    }

    /// Live connection for a server, present only while `running`.
    pub async fn connection(&self, id: i64) -> Option<Arc<dyn McpConnection>> {
        let runtime = self.runtime.read().await;
        runtime.get(&id).and_then(|entry| {
            (entry.status == ServerStatus::Running)
                .then(|| entry.connection.clone())
                .flatten()
        })
    }

    pub async fn server_id(&self, name: &str) -> Option<i64> {
        self.names.read().await.get(name).copied()
    }

    pub async fn server_name(&self, id: i64) -> Option<String> {
        let names = self.names.read().await;
        names
            .iter()
            .find(|(_, v)| **v == id)
            .map(|(name, _)| name.clone())
    }

    /// Snapshot of running servers as `(id, name, connection)`.
    ///
    /// A server transitioning mid-listing is not rolled back; callers get a
    /// best-effort view of whoever is running at call time.
    pub async fn running_connections(&self) -> Vec<(i64, String, Arc<dyn McpConnection>)> {
        let names = self.names.read().await;
        let runtime = self.runtime.read().await;

        let mut out = Vec::new();
        for (name, id) in names.iter() {
            if let Some(entry) = runtime.get(id) {
                if entry.status == ServerStatus::Running {
                    if let Some(connection) = entry.connection.clone() {
                        out.push((*id, name.clone(), connection));
                    }
                }
            }
        }
        // Iteration order is the collision tie-break for tool names; keep it
        // deterministic.
        out.sort_by(|a, b| a.1.cmp(&b.1));
        out
    }
}

fn unknown_target(e: RepositoryError) -> GatewayError {
    match e {
        RepositoryError::NotFound(what) => GatewayError::UnknownTarget(what),
        other => GatewayError::Repository(other),
    }
}
