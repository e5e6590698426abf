//! In-memory fakes for exercising the gateway without real child servers.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mcphub_core::{
    ApiToken, AuditCursor, AuditPage, AuditRecord, AuditRepository, AuditStats, ClientError,
    ConnectionError, CountBucket, GatewayError, McpConnection, McpPrompt, McpResource,
    McpResourceTemplate, McpServer, McpTool, NewAuditRecord, NewMcpServer, NewWorkspace,
    RepositoryError, ServerConnector, ServerRepository, TokenRepository, ToolCallResult,
    Workspace, WorkspaceRepository,
};
use serde_json::Value;

use crate::context::{StoreOpener, Stores};

// ─────────────────────────────────────────────────────────────────────────────
// In-memory repositories
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryServerRepository {
    servers: Mutex<Vec<McpServer>>,
    next_id: Mutex<i64>,
}

#[async_trait]
impl ServerRepository for MemoryServerRepository {
    async fn insert(&self, new_server: NewMcpServer) -> Result<McpServer, RepositoryError> {
        let mut servers = self.servers.lock().unwrap();
        if servers.iter().any(|s| s.name == new_server.name) {
            return Err(RepositoryError::Conflict(new_server.name));
        }

        let id = {
            let mut next_id = self.next_id.lock().unwrap();
            *next_id += 1;
            *next_id
        };

        let server = McpServer {
            id,
            name: new_server.name,
            transport: new_server.transport,
            config: new_server.config,
            enabled: new_server.enabled,
            auto_start: new_server.auto_start,
            env: new_server.env,
            created_at: chrono::Utc::now(),
            last_error: None,
        };
        servers.push(server.clone());
        Ok(server)
    }

    async fn get_by_id(&self, id: i64) -> Result<McpServer, RepositoryError> {
        self.servers
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }

    async fn get_by_name(&self, name: &str) -> Result<McpServer, RepositoryError> {
        self.servers
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.name == name)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(name.to_string()))
    }

    async fn list(&self) -> Result<Vec<McpServer>, RepositoryError> {
        let mut servers = self.servers.lock().unwrap().clone();
        servers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(servers)
    }

    async fn update(&self, server: &McpServer) -> Result<(), RepositoryError> {
        let mut servers = self.servers.lock().unwrap();
        let slot = servers
            .iter_mut()
            .find(|s| s.id == server.id)
            .ok_or_else(|| RepositoryError::NotFound(server.id.to_string()))?;
        *slot = server.clone();
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        let mut servers = self.servers.lock().unwrap();
        let before = servers.len();
        servers.retain(|s| s.id != id);
        if servers.len() == before {
            return Err(RepositoryError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn set_last_error(&self, id: i64, error: Option<String>) -> Result<(), RepositoryError> {
        let mut servers = self.servers.lock().unwrap();
        let slot = servers
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        slot.last_error = error;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryTokenRepository {
    tokens: Mutex<Vec<ApiToken>>,
}

#[async_trait]
impl TokenRepository for MemoryTokenRepository {
    async fn insert(&self, token: &ApiToken) -> Result<(), RepositoryError> {
        let mut tokens = self.tokens.lock().unwrap();
        if tokens.iter().any(|t| t.id == token.id) {
            return Err(RepositoryError::Conflict("token".into()));
        }
        tokens.push(token.clone());
        Ok(())
    }

    async fn get(&self, token_id: &str) -> Result<ApiToken, RepositoryError> {
        self.tokens
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == token_id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound("token".into()))
    }

    async fn list(&self) -> Result<Vec<ApiToken>, RepositoryError> {
        Ok(self.tokens.lock().unwrap().clone())
    }

    async fn delete(&self, token_id: &str) -> Result<(), RepositoryError> {
        let mut tokens = self.tokens.lock().unwrap();
        let before = tokens.len();
        tokens.retain(|t| t.id != token_id);
        if tokens.len() == before {
            return Err(RepositoryError::NotFound("token".into()));
        }
        Ok(())
    }

    async fn delete_for_client(&self, client_id: &str) -> Result<u64, RepositoryError> {
        let mut tokens = self.tokens.lock().unwrap();
        let before = tokens.len();
        tokens.retain(|t| t.client_id != client_id);
        Ok((before - tokens.len()) as u64)
    }

    async fn grant_to_all(&self, server_id: i64) -> Result<(), RepositoryError> {
        let mut tokens = self.tokens.lock().unwrap();
        for token in tokens.iter_mut() {
            if !token.server_ids.contains(&server_id) {
                token.server_ids.push(server_id);
            }
        }
        Ok(())
    }

    async fn revoke_from_all(&self, server_id: i64) -> Result<(), RepositoryError> {
        let mut tokens = self.tokens.lock().unwrap();
        for token in tokens.iter_mut() {
            token.server_ids.retain(|id| *id != server_id);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryAuditRepository {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditRepository {
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditRepository for MemoryAuditRepository {
    async fn insert(&self, record: &NewAuditRecord) -> Result<i64, RepositoryError> {
        let mut records = self.records.lock().unwrap();
        let id = records.len() as i64 + 1;
        records.push(AuditRecord {
            id,
            created_at: chrono::Utc::now(),
            client_id: record.client_id.clone(),
            server_id: record.server_id,
            server_name: record.server_name.clone(),
            operation: record.operation,
            status: record.status,
            duration_ms: record.duration_ms,
            params: record.params.clone(),
            error: record.error.clone(),
        });
        Ok(id)
    }

    async fn page(
        &self,
        limit: u32,
        cursor: Option<AuditCursor>,
    ) -> Result<AuditPage, RepositoryError> {
        let records = self.records.lock().unwrap();
        let mut newest_first: Vec<AuditRecord> = records.iter().rev().cloned().collect();
        if let Some(cursor) = cursor {
            newest_first.retain(|r| r.id < cursor.id);
        }
        let has_more = newest_first.len() > limit as usize;
        newest_first.truncate(limit as usize);
        let next_cursor = if has_more {
            newest_first.last().map(|r| {
                AuditCursor {
                    created_at: r.created_at,
                    id: r.id,
                }
                .encode()
            })
        } else {
            None
        };
        Ok(AuditPage {
            records: newest_first,
            next_cursor,
        })
    }

    async fn stats(&self) -> Result<AuditStats, RepositoryError> {
        let records = self.records.lock().unwrap();
        let mut by_client: HashMap<String, i64> = HashMap::new();
        let mut by_server: HashMap<String, i64> = HashMap::new();
        let mut by_operation: HashMap<String, i64> = HashMap::new();
        for record in records.iter() {
            *by_client.entry(record.client_id.clone()).or_default() += 1;
            if let Some(name) = &record.server_name {
                *by_server.entry(name.clone()).or_default() += 1;
            }
            *by_operation
                .entry(record.operation.as_str().to_string())
                .or_default() += 1;
        }
        let buckets = |map: HashMap<String, i64>| {
            let mut out: Vec<CountBucket> = map
                .into_iter()
                .map(|(key, count)| CountBucket { key, count })
                .collect();
            out.sort_by(|a, b| b.count.cmp(&a.count));
            out
        };
        Ok(AuditStats {
            by_client: buckets(by_client),
            by_server: buckets(by_server),
            by_operation: buckets(by_operation),
        })
    }
}

/// Bundle of in-memory repositories for one test.
pub struct MemoryRepos {
    pub servers: Arc<MemoryServerRepository>,
    pub tokens: Arc<MemoryTokenRepository>,
    pub audit: Arc<MemoryAuditRepository>,
}

impl MemoryRepos {
    pub fn new() -> Self {
        Self {
            servers: Arc::new(MemoryServerRepository::default()),
            tokens: Arc::new(MemoryTokenRepository::default()),
            audit: Arc::new(MemoryAuditRepository::default()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Fake child servers
// ─────────────────────────────────────────────────────────────────────────────

/// Catalog one fake child serves.
#[derive(Default, Clone)]
pub struct FakeCatalog {
    pub tools: Vec<McpTool>,
    pub resources: Vec<McpResource>,
    pub templates: Vec<McpResourceTemplate>,
    pub prompts: Vec<McpPrompt>,
    /// Literal URI -> contents answered by `read_resource`.
    pub contents: HashMap<String, Vec<Value>>,
    pub prompt_bodies: HashMap<String, Value>,
    pub tool_results: HashMap<String, ToolCallResult>,
}

impl FakeCatalog {
    pub fn with_tool(mut self, name: &str, result: ToolCallResult) -> Self {
        self.tools.push(McpTool {
            name: name.to_string(),
            description: None,
            input_schema: Some(serde_json::json!({"type": "object"})),
        });
        self.tool_results.insert(name.to_string(), result);
        self
    }

    pub fn with_resource(mut self, uri: &str, contents: Vec<Value>) -> Self {
        self.resources.push(McpResource {
            uri: uri.to_string(),
            name: Some(uri.to_string()),
            description: None,
            mime_type: None,
        });
        self.contents.insert(uri.to_string(), contents);
        self
    }

    pub fn with_prompt(mut self, name: &str, body: Value) -> Self {
        self.prompts.push(McpPrompt {
            name: name.to_string(),
            description: None,
            arguments: None,
        });
        self.prompt_bodies.insert(name.to_string(), body);
        self
    }
}

/// One fake live connection. Records every tool call and resource read.
pub struct FakeConnection {
    catalog: FakeCatalog,
    pub tool_calls: Mutex<Vec<(String, Value)>>,
    pub read_uris: Mutex<Vec<String>>,
}

impl FakeConnection {
    fn new(catalog: FakeCatalog) -> Self {
        Self {
            catalog,
            tool_calls: Mutex::new(Vec::new()),
            read_uris: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl McpConnection for FakeConnection {
    async fn list_tools(&self) -> Result<Vec<McpTool>, ClientError> {
        Ok(self.catalog.tools.clone())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolCallResult, ClientError> {
        self.tool_calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments));
        self.catalog.tool_results.get(name).cloned().ok_or_else(|| {
            ClientError::Downstream {
                code: -32602,
                message: format!("unknown tool: {name}"),
                data: None,
            }
        })
    }

    async fn list_resources(&self) -> Result<Vec<McpResource>, ClientError> {
        Ok(self.catalog.resources.clone())
    }

    async fn read_resource(&self, uri: &str) -> Result<Vec<Value>, ClientError> {
        self.read_uris.lock().unwrap().push(uri.to_string());
        Ok(self.catalog.contents.get(uri).cloned().unwrap_or_default())
    }

    async fn list_resource_templates(&self) -> Result<Vec<McpResourceTemplate>, ClientError> {
        Ok(self.catalog.templates.clone())
    }

    async fn list_prompts(&self) -> Result<Vec<McpPrompt>, ClientError> {
        Ok(self.catalog.prompts.clone())
    }

    async fn get_prompt(&self, name: &str, _arguments: Option<Value>) -> Result<Value, ClientError> {
        self.catalog
            .prompt_bodies
            .get(name)
            .cloned()
            .ok_or_else(|| ClientError::Downstream {
                code: -32602,
                message: format!("unknown prompt: {name}"),
                data: None,
            })
    }

    async fn shutdown(&self) {}
}

/// Connector handing out fake connections keyed by server name.
#[derive(Default)]
pub struct FakeConnector {
    delay_ms: u64,
    fail_all: Option<String>,
    fail_names: HashSet<String>,
    catalogs: Mutex<HashMap<String, FakeCatalog>>,
    connections: Mutex<HashMap<String, Arc<FakeConnection>>>,
    connects: AtomicUsize,
}

impl FakeConnector {
    pub fn with_catalog(self, name: &str, catalog: FakeCatalog) -> Self {
        self.catalogs
            .lock()
            .unwrap()
            .insert(name.to_string(), catalog);
        self
    }

    /// Every connect attempt fails with this message.
    pub fn failing(mut self, message: &str) -> Self {
        self.fail_all = Some(message.to_string());
        self
    }

    /// Connect attempts for one named server fail.
    pub fn failing_for(mut self, name: &str) -> Self {
        self.fail_names.insert(name.to_string());
        self
    }

    pub fn with_connect_delay(mut self, millis: u64) -> Self {
        self.delay_ms = millis;
        self
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// The live fake connection for a named server, if connected.
    pub fn connection(&self, name: &str) -> Option<Arc<FakeConnection>> {
        self.connections.lock().unwrap().get(name).cloned()
    }
}

#[async_trait]
impl ServerConnector for FakeConnector {
    async fn connect(&self, server: &McpServer) -> Result<Arc<dyn McpConnection>, ConnectionError> {
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }

        if let Some(message) = &self.fail_all {
            return Err(ConnectionError::new(message.clone()));
        }
        if self.fail_names.contains(&server.name) {
            return Err(ConnectionError::new(format!(
                "connect refused for {}",
                server.name
            )));
        }

        self.connects.fetch_add(1, Ordering::SeqCst);

        let catalog = self
            .catalogs
            .lock()
            .unwrap()
            .get(&server.name)
            .cloned()
            .unwrap_or_default();
        let connection = Arc::new(FakeConnection::new(catalog));
        self.connections
            .lock()
            .unwrap()
            .insert(server.name.clone(), connection.clone());
        Ok(connection)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Workspace fakes
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryWorkspaceRepository {
    workspaces: Mutex<Vec<Workspace>>,
    next_id: Mutex<i64>,
}

#[async_trait]
impl WorkspaceRepository for MemoryWorkspaceRepository {
    async fn insert(&self, new: NewWorkspace) -> Result<Workspace, RepositoryError> {
        let mut workspaces = self.workspaces.lock().unwrap();
        if workspaces.iter().any(|w| w.name == new.name) {
            return Err(RepositoryError::Conflict(new.name));
        }

        let id = {
            let mut next_id = self.next_id.lock().unwrap();
            *next_id += 1;
            *next_id
        };

        let workspace = Workspace {
            id,
            name: new.name,
            kind: new.kind,
            active: false,
            store: new.store,
        };
        workspaces.push(workspace.clone());
        Ok(workspace)
    }

    async fn get(&self, id: i64) -> Result<Workspace, RepositoryError> {
        self.workspaces
            .lock()
            .unwrap()
            .iter()
            .find(|w| w.id == id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }

    async fn list(&self) -> Result<Vec<Workspace>, RepositoryError> {
        Ok(self.workspaces.lock().unwrap().clone())
    }

    async fn active(&self) -> Result<Option<Workspace>, RepositoryError> {
        Ok(self
            .workspaces
            .lock()
            .unwrap()
            .iter()
            .find(|w| w.active)
            .cloned())
    }

    async fn set_active(&self, id: i64) -> Result<(), RepositoryError> {
        let mut workspaces = self.workspaces.lock().unwrap();
        if !workspaces.iter().any(|w| w.id == id) {
            return Err(RepositoryError::NotFound(id.to_string()));
        }
        for workspace in workspaces.iter_mut() {
            workspace.active = workspace.id == id;
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        let mut workspaces = self.workspaces.lock().unwrap();
        let before = workspaces.len();
        workspaces.retain(|w| w.id != id);
        if workspaces.len() == before {
            return Err(RepositoryError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

/// Opener handing out persistent in-memory store bundles keyed by locator,
/// so "reopening" a store sees the state written through it earlier.
#[derive(Default)]
pub struct MemoryStoreOpener {
    delay_ms: u64,
    failing: HashSet<String>,
    stores: Mutex<HashMap<String, Stores>>,
}

impl MemoryStoreOpener {
    /// Open attempts for one store locator fail.
    pub fn failing_for(mut self, store: &str) -> Self {
        self.failing.insert(store.to_string());
        self
    }

    pub fn with_open_delay(mut self, millis: u64) -> Self {
        self.delay_ms = millis;
        self
    }
}

#[async_trait]
impl StoreOpener for MemoryStoreOpener {
    async fn open(&self, store: &str) -> Result<Stores, GatewayError> {
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
        if self.failing.contains(store) {
            return Err(GatewayError::Repository(RepositoryError::Internal(
                format!("cannot open store: {store}"),
            )));
        }

        let mut stores = self.stores.lock().unwrap();
        let bundle = stores.entry(store.to_string()).or_insert_with(|| {
            let repos = MemoryRepos::new();
            Stores {
                servers: repos.servers,
                tokens: repos.tokens,
                audit: repos.audit,
            }
        });
        Ok(bundle.clone())
    }
}
