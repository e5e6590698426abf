//! Aggregated MCP operations over every running child server.
//!
//! Listings fan out over the running, token-authorized servers and merge the
//! results; one misbehaving child is skipped with a warning, never failing
//! the whole listing. Tool dispatch goes through a name map rebuilt from
//! scratch on every listing, resources through the namespaced URI scheme,
//! prompts through the `<server>/<prompt>` prefix.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use mcphub_core::domain::uri;
use mcphub_core::{
    ApiToken, ClientError, GatewayError, McpPrompt, McpResource, McpResourceTemplate, McpTool,
    OperationKind, OperationStatus, ResourceContents, ToolCallResult,
};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::agent_tools;
use crate::audit::AuditRecorder;
use crate::auth::{TokenValidator, OWNER_CLIENT_ID};
use crate::registry::ServerRegistry;

/// What a caller is allowed to see, resolved once per operation.
enum CallerScope {
    /// Tokenless local caller. Sees everything.
    Owner,
    /// Token-bearing caller, limited to the token's server grants.
    Scoped(ApiToken),
}

impl CallerScope {
    fn client_id(&self) -> &str {
        match self {
            Self::Owner => OWNER_CLIENT_ID,
            Self::Scoped(token) => &token.client_id,
        }
    }

    fn allows(&self, server_id: i64) -> bool {
        match self {
            Self::Owner => true,
            Self::Scoped(token) => token.has_access(server_id),
        }
    }
}

/// The aggregation core. One instance per open workspace.
pub struct Aggregator {
    registry: Arc<ServerRegistry>,
    validator: Arc<TokenValidator>,
    audit: Arc<AuditRecorder>,

    /// `tool name -> server name`, rebuilt from scratch on every tool
    /// listing. Collisions resolve to the last-listed server.
    tool_map: RwLock<HashMap<String, String>>,

    /// `namespaced uri -> original scheme`, rebuilt on every resource
    /// listing so reads can retry the child's own URI form.
    uri_schemes: RwLock<HashMap<String, String>>,
}

impl Aggregator {
    pub fn new(
        registry: Arc<ServerRegistry>,
        validator: Arc<TokenValidator>,
        audit: Arc<AuditRecorder>,
    ) -> Self {
        Self {
            registry,
            validator,
            audit,
            tool_map: RwLock::new(HashMap::new()),
            uri_schemes: RwLock::new(HashMap::new()),
        }
    }

    // =========================================================================
    // Tools
    // =========================================================================

    /// Merge tool listings from every running, authorized server, then append
    /// the gateway's own virtual tools.
    pub async fn list_tools(&self, token: Option<&str>) -> Result<Vec<McpTool>, GatewayError> {
        let started = Instant::now();
        let scope = self.scope(token).await?;

        let mut merged = Vec::new();
        let mut map = HashMap::new();
        for (server_id, server_name, connection) in self.registry.running_connections().await {
            if !scope.allows(server_id) {
                continue;
            }
            match connection.list_tools().await {
                Ok(tools) => {
                    for tool in tools {
                        if let Some(previous) = map.insert(tool.name.clone(), server_name.clone())
                        {
                            tracing::warn!(
                                tool_name = %tool.name,
                                winner = %server_name,
                                shadowed = %previous,
                                "Tool name collision in aggregated listing"
                            );
                        }
                        merged.push(tool);
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        server_name = %server_name,
                        error = %err,
                        "Skipping server in tool listing"
                    );
                }
            }
        }

        // Virtual tools are served in-process and never enter the dispatch
        // map; unmapped calls fall back to them.
        merged.extend(agent_tools::tools());
        *self.tool_map.write().await = map;

        self.finish(
            scope.client_id(),
            None,
            None,
            OperationKind::ListTools,
            started,
            None,
            Ok(merged),
        )
        .await
    }

    /// Dispatch a tool call to whichever server last listed the tool, or to
    /// the virtual server when no listing mapped the name.
    pub async fn call_tool(
        &self,
        token: Option<&str>,
        name: &str,
        arguments: Value,
    ) -> Result<ToolCallResult, GatewayError> {
        let started = Instant::now();
        let params = serde_json::json!({"name": name, "arguments": arguments});
        let owner = self.tool_map.read().await.get(name).cloned();

        let Some(server_name) = owner else {
            let client_id = match token {
                Some(id) => self.validator.validate(id).await?.client_id,
                None => OWNER_CLIENT_ID.to_string(),
            };
            let result = agent_tools::call(name, &arguments);
            return self
                .finish(
                    &client_id,
                    None,
                    Some(agent_tools::AGENT_TOOLS_SERVER),
                    OperationKind::CallTool,
                    started,
                    Some(&params),
                    result,
                )
                .await;
        };

        let (server_id, client_id) = self
            .validator
            .validate_and_authorize(token, &server_name)
            .await?;

        let result = match self.registry.connection(server_id).await {
            Some(connection) => connection
                .call_tool(name, arguments)
                .await
                .map_err(GatewayError::from),
            None => Err(GatewayError::NotRunning(server_name.clone())),
        };

        self.finish(
            &client_id,
            Some(server_id),
            Some(&server_name),
            OperationKind::CallTool,
            started,
            Some(&params),
            result,
        )
        .await
    }

    // =========================================================================
    // Resources
    // =========================================================================

    /// Merge resource listings, rewriting every URI into the collision-free
    /// `resource://<server>/<path>` namespace.
    pub async fn list_resources(
        &self,
        token: Option<&str>,
    ) -> Result<Vec<McpResource>, GatewayError> {
        let started = Instant::now();
        let scope = self.scope(token).await?;

        let mut merged = Vec::new();
        let mut schemes = HashMap::new();
        for (server_id, server_name, connection) in self.registry.running_connections().await {
            if !scope.allows(server_id) {
                continue;
            }
            match connection.list_resources().await {
                Ok(resources) => {
                    for mut resource in resources {
                        let (namespaced, scheme) = uri::namespace_uri(&server_name, &resource.uri);
                        if let Some(scheme) = scheme {
                            schemes.insert(namespaced.clone(), scheme);
                        }
                        resource.uri = namespaced;
                        merged.push(resource);
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        server_name = %server_name,
                        error = %err,
                        "Skipping server in resource listing"
                    );
                }
            }
        }

        *self.uri_schemes.write().await = schemes;

        self.finish(
            scope.client_id(),
            None,
            None,
            OperationKind::ListResources,
            started,
            None,
            Ok(merged),
        )
        .await
    }

    /// Read one namespaced resource from its owning server, trying the URI
    /// forms the child is most likely to accept in order. All-empty is a
    /// valid outcome, not an error.
    pub async fn read_resource(
        &self,
        token: Option<&str>,
        uri: &str,
    ) -> Result<ResourceContents, GatewayError> {
        let started = Instant::now();
        let Some((server_name, path)) = uri::parse_namespaced(uri) else {
            return Err(GatewayError::InvalidParams(format!(
                "resource URI must be resource://<server>/<path>: {uri}"
            )));
        };
        let server_name = server_name.to_string();
        let path = path.to_string();

        let (server_id, client_id) = self
            .validator
            .validate_and_authorize(token, &server_name)
            .await?;
        let params = serde_json::json!({"uri": uri});

        let result = self
            .read_from_server(server_id, &server_name, uri, &path)
            .await;

        self.finish(
            &client_id,
            Some(server_id),
            Some(&server_name),
            OperationKind::ReadResource,
            started,
            Some(&params),
            result,
        )
        .await
    }

    async fn read_from_server(
        &self,
        server_id: i64,
        server_name: &str,
        namespaced: &str,
        path: &str,
    ) -> Result<ResourceContents, GatewayError> {
        let connection = self
            .registry
            .connection(server_id)
            .await
            .ok_or_else(|| GatewayError::NotRunning(server_name.to_string()))?;
        let scheme = self.uri_schemes.read().await.get(namespaced).cloned();

        for candidate in uri::read_candidates(path, scheme.as_deref()) {
            match connection.read_resource(&candidate).await {
                Ok(contents) if !contents.is_empty() => {
                    return Ok(ResourceContents { contents });
                }
                Ok(_) => {}
                // A child rejecting one URI form may accept the next.
                Err(ClientError::Downstream { code, message, .. }) => {
                    tracing::debug!(
                        uri = %candidate,
                        code,
                        message = %message,
                        "Read candidate rejected by server"
                    );
                }
                Err(err @ ClientError::Connection(_)) => return Err(err.into()),
            }
        }

        Ok(ResourceContents::empty())
    }

    /// Merge resource template listings with the same URI rewrite as
    /// resources.
    pub async fn list_resource_templates(
        &self,
        token: Option<&str>,
    ) -> Result<Vec<McpResourceTemplate>, GatewayError> {
        let started = Instant::now();
        let scope = self.scope(token).await?;

        let mut merged = Vec::new();
        for (server_id, server_name, connection) in self.registry.running_connections().await {
            if !scope.allows(server_id) {
                continue;
            }
            match connection.list_resource_templates().await {
                Ok(templates) => {
                    for mut template in templates {
                        let (namespaced, _) =
                            uri::namespace_uri(&server_name, &template.uri_template);
                        template.uri_template = namespaced;
                        merged.push(template);
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        server_name = %server_name,
                        error = %err,
                        "Skipping server in template listing"
                    );
                }
            }
        }

        self.finish(
            scope.client_id(),
            None,
            None,
            OperationKind::ListResourceTemplates,
            started,
            None,
            Ok(merged),
        )
        .await
    }

    // =========================================================================
    // Prompts
    // =========================================================================

    /// Merge prompt listings, prefixing every prompt name with its owning
    /// server as `<server>/<prompt>`.
    pub async fn list_prompts(&self, token: Option<&str>) -> Result<Vec<McpPrompt>, GatewayError> {
        let started = Instant::now();
        let scope = self.scope(token).await?;

        let mut merged = Vec::new();
        for (server_id, server_name, connection) in self.registry.running_connections().await {
            if !scope.allows(server_id) {
                continue;
            }
            match connection.list_prompts().await {
                Ok(prompts) => {
                    for mut prompt in prompts {
                        prompt.name = format!("{server_name}/{}", prompt.name);
                        merged.push(prompt);
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        server_name = %server_name,
                        error = %err,
                        "Skipping server in prompt listing"
                    );
                }
            }
        }

        self.finish(
            scope.client_id(),
            None,
            None,
            OperationKind::ListPrompts,
            started,
            None,
            Ok(merged),
        )
        .await
    }

    /// Fetch one prompt body from its owning server. The name is split on
    /// the first `/` before anything touches the network.
    pub async fn get_prompt(
        &self,
        token: Option<&str>,
        name: &str,
        arguments: Option<Value>,
    ) -> Result<Value, GatewayError> {
        let started = Instant::now();
        let Some((server_name, prompt_name)) = name.split_once('/') else {
            return Err(GatewayError::InvalidParams(format!(
                "prompt name must be <server>/<prompt>: {name}"
            )));
        };

        let (server_id, client_id) = self
            .validator
            .validate_and_authorize(token, server_name)
            .await?;
        let params = serde_json::json!({"name": name});

        let result = match self.registry.connection(server_id).await {
            Some(connection) => connection
                .get_prompt(prompt_name, arguments)
                .await
                .map_err(GatewayError::from),
            None => Err(GatewayError::NotRunning(server_name.to_string())),
        };

        self.finish(
            &client_id,
            Some(server_id),
            Some(server_name),
            OperationKind::GetPrompt,
            started,
            Some(&params),
            result,
        )
        .await
    }

    // =========================================================================
    // Shared plumbing
    // =========================================================================

    async fn scope(&self, token: Option<&str>) -> Result<CallerScope, GatewayError> {
        match token {
            None => Ok(CallerScope::Owner),
            Some(id) => Ok(CallerScope::Scoped(self.validator.validate(id).await?)),
        }
    }

    /// Record the audit trail entry for a finished operation and hand the
    /// result back. Audit persistence failures propagate.
    #[allow(clippy::too_many_arguments)]
    async fn finish<T>(
        &self,
        client_id: &str,
        server_id: Option<i64>,
        server_name: Option<&str>,
        operation: OperationKind,
        started: Instant,
        params: Option<&Value>,
        result: Result<T, GatewayError>,
    ) -> Result<T, GatewayError> {
        let duration_ms = started.elapsed().as_millis() as i64;
        match result {
            Ok(value) => {
                self.audit
                    .record(
                        client_id,
                        server_id,
                        server_name,
                        operation,
                        OperationStatus::Ok,
                        duration_ms,
                        params,
                        None,
                    )
                    .await?;
                Ok(value)
            }
            Err(err) => {
                self.audit
                    .record(
                        client_id,
                        server_id,
                        server_name,
                        operation,
                        OperationStatus::Error,
                        duration_ms,
                        params,
                        Some(err.to_string()),
                    )
                    .await?;
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeCatalog, FakeConnector, MemoryRepos};
    use mcphub_core::{NewApiToken, NewMcpServer, NoopEmitter};
    use serde_json::json;

    struct Fixture {
        repos: MemoryRepos,
        connector: Arc<FakeConnector>,
        registry: Arc<ServerRegistry>,
        validator: Arc<TokenValidator>,
        aggregator: Aggregator,
    }

    async fn fixture(connector: FakeConnector) -> Fixture {
        let repos = MemoryRepos::new();
        let connector = Arc::new(connector);
        let registry = Arc::new(ServerRegistry::new(
            repos.servers.clone(),
            repos.tokens.clone(),
            connector.clone(),
            Arc::new(NoopEmitter),
        ));
        let validator = Arc::new(TokenValidator::new(
            repos.tokens.clone(),
            registry.clone(),
            Arc::new(NoopEmitter),
        ));
        let audit = Arc::new(AuditRecorder::new(repos.audit.clone()));
        let aggregator = Aggregator::new(registry.clone(), validator.clone(), audit);
        Fixture {
            repos,
            connector,
            registry,
            validator,
            aggregator,
        }
    }

    async fn add_and_start(fixture: &Fixture, name: &str) -> mcphub_core::McpServer {
        let server = fixture
            .registry
            .add_server(NewMcpServer::stdio(name, "cmd", vec![]))
            .await
            .unwrap();
        fixture.registry.start(server.id).await.unwrap();
        server
    }

    fn text_result(text: &str) -> ToolCallResult {
        ToolCallResult::ok(json!([{"type": "text", "text": text}]))
    }

    #[tokio::test]
    async fn listing_merges_running_servers_and_appends_virtual_tools() {
        let fixture = fixture(
            FakeConnector::default()
                .with_catalog("alpha", FakeCatalog::default().with_tool("build", text_result("ok")))
                .with_catalog("beta", FakeCatalog::default().with_tool("deploy", text_result("ok"))),
        )
        .await;
        add_and_start(&fixture, "alpha").await;
        add_and_start(&fixture, "beta").await;

        let tools = fixture.aggregator.list_tools(None).await.unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();

        assert!(names.contains(&"build"));
        assert!(names.contains(&"deploy"));
        assert!(names.contains(&"hub_ping"));
        assert!(names.contains(&"hub_time"));
    }

    #[tokio::test]
    async fn token_scope_limits_listing_and_dispatch() {
        let fixture = fixture(
            FakeConnector::default()
                .with_catalog("alpha", FakeCatalog::default().with_tool("build", text_result("a")))
                .with_catalog("beta", FakeCatalog::default().with_tool("deploy", text_result("b"))),
        )
        .await;
        let alpha = add_and_start(&fixture, "alpha").await;
        add_and_start(&fixture, "beta").await;

        let token = fixture
            .validator
            .issue(NewApiToken {
                client_id: "cursor".into(),
                server_ids: vec![alpha.id],
            })
            .await
            .unwrap();

        let tools = fixture
            .aggregator
            .list_tools(Some(&token.id))
            .await
            .unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert!(names.contains(&"build"));
        assert!(!names.contains(&"deploy"));

        // Map the out-of-scope tool via an owner listing, then dispatch with
        // the scoped token. The rejection is the generic one.
        fixture.aggregator.list_tools(None).await.unwrap();
        let err = fixture
            .aggregator
            .call_tool(Some(&token.id), "deploy", json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid request");
    }

    #[tokio::test]
    async fn colliding_tool_name_dispatches_to_last_listed_server() {
        let fixture = fixture(
            FakeConnector::default()
                .with_catalog(
                    "alpha",
                    FakeCatalog::default().with_tool("search", text_result("from alpha")),
                )
                .with_catalog(
                    "beta",
                    FakeCatalog::default().with_tool("search", text_result("from beta")),
                ),
        )
        .await;
        add_and_start(&fixture, "alpha").await;
        add_and_start(&fixture, "beta").await;

        let tools = fixture.aggregator.list_tools(None).await.unwrap();
        // Both listings survive in the merged list.
        assert_eq!(tools.iter().filter(|t| t.name == "search").count(), 2);

        // Listings run in name order, so beta listed last and owns dispatch.
        let result = fixture
            .aggregator
            .call_tool(None, "search", json!({}))
            .await
            .unwrap();
        assert_eq!(result.content[0]["text"], "from beta");
    }

    #[tokio::test]
    async fn tool_map_rebuilds_from_scratch_each_listing() {
        let fixture = fixture(
            FakeConnector::default()
                .with_catalog("alpha", FakeCatalog::default().with_tool("build", text_result("a")))
                .with_catalog("beta", FakeCatalog::default().with_tool("deploy", text_result("b"))),
        )
        .await;
        add_and_start(&fixture, "alpha").await;
        let beta = add_and_start(&fixture, "beta").await;

        fixture.aggregator.list_tools(None).await.unwrap();
        fixture.registry.stop(beta.id).await.unwrap();
        fixture.aggregator.list_tools(None).await.unwrap();

        // The stale mapping is gone; the call falls through to the virtual
        // server and fails there instead of hitting a dead connection.
        let err = fixture
            .aggregator
            .call_tool(None, "deploy", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::UnknownTarget(_)));
    }

    #[tokio::test]
    async fn unmapped_tool_call_falls_back_to_virtual_server() {
        let fixture = fixture(FakeConnector::default()).await;

        let result = fixture
            .aggregator
            .call_tool(None, "hub_ping", json!({}))
            .await
            .unwrap();
        assert_eq!(result.content[0]["text"], "pong");

        let records = fixture.repos.audit.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].server_name.as_deref(), Some("Agent Tools"));
        assert!(records[0].server_id.is_none());
    }

    #[tokio::test]
    async fn one_failing_child_does_not_poison_the_listing() {
        let fixture = fixture(
            FakeConnector::default()
                .with_catalog("alpha", FakeCatalog::default().with_tool("build", text_result("a")))
                .with_catalog("beta", FakeCatalog::default().with_tool("deploy", text_result("b"))),
        )
        .await;
        let alpha = add_and_start(&fixture, "alpha").await;
        add_and_start(&fixture, "beta").await;

        // Stop alpha mid-flight: it drops out of the running set and the
        // listing still succeeds with beta's tools.
        fixture.registry.stop(alpha.id).await.unwrap();
        let tools = fixture.aggregator.list_tools(None).await.unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert!(!names.contains(&"build"));
        assert!(names.contains(&"deploy"));
    }

    #[tokio::test]
    async fn identical_paths_on_two_servers_resolve_independently() {
        let fixture = fixture(
            FakeConnector::default()
                .with_catalog(
                    "alpha",
                    FakeCatalog::default()
                        .with_resource("notes://doc", vec![json!({"text": "alpha doc"})]),
                )
                .with_catalog(
                    "beta",
                    FakeCatalog::default()
                        .with_resource("notes://doc", vec![json!({"text": "beta doc"})]),
                ),
        )
        .await;
        add_and_start(&fixture, "alpha").await;
        add_and_start(&fixture, "beta").await;

        let resources = fixture.aggregator.list_resources(None).await.unwrap();
        let uris: Vec<&str> = resources.iter().map(|r| r.uri.as_str()).collect();
        assert!(uris.contains(&"resource://alpha/doc"));
        assert!(uris.contains(&"resource://beta/doc"));

        let alpha_read = fixture
            .aggregator
            .read_resource(None, "resource://alpha/doc")
            .await
            .unwrap();
        assert_eq!(alpha_read.contents[0]["text"], "alpha doc");

        let beta_read = fixture
            .aggregator
            .read_resource(None, "resource://beta/doc")
            .await
            .unwrap();
        assert_eq!(beta_read.contents[0]["text"], "beta doc");
    }

    #[tokio::test]
    async fn read_walks_candidates_and_all_empty_is_not_an_error() {
        // The child lists `notes://doc` but only answers the bare path.
        let mut catalog = FakeCatalog::default().with_resource("notes://doc", vec![]);
        catalog
            .contents
            .insert("doc".to_string(), vec![json!({"text": "bare form"})]);

        let fixture =
            fixture(FakeConnector::default().with_catalog("alpha", catalog)).await;
        add_and_start(&fixture, "alpha").await;

        fixture.aggregator.list_resources(None).await.unwrap();
        let read = fixture
            .aggregator
            .read_resource(None, "resource://alpha/doc")
            .await
            .unwrap();
        assert_eq!(read.contents[0]["text"], "bare form");

        let connection = fixture.connector.connection("alpha").unwrap();
        let attempted = connection.read_uris.lock().unwrap().clone();
        assert_eq!(
            attempted,
            vec![
                "resource://doc".to_string(),
                "notes://doc".to_string(),
                "doc".to_string(),
            ]
        );

        // Nothing answers this path anywhere: explicit empty contents.
        let empty = fixture
            .aggregator
            .read_resource(None, "resource://alpha/missing")
            .await
            .unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn foreign_resource_uri_is_rejected_before_dispatch() {
        let fixture = fixture(FakeConnector::default()).await;

        let err = fixture
            .aggregator
            .read_resource(None, "file:///etc/passwd")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidParams(_)));
    }

    #[tokio::test]
    async fn prompts_are_namespaced_and_split_before_dispatch() {
        let fixture = fixture(FakeConnector::default().with_catalog(
            "alpha",
            FakeCatalog::default().with_prompt("greet", json!({"messages": []})),
        ))
        .await;
        add_and_start(&fixture, "alpha").await;

        let prompts = fixture.aggregator.list_prompts(None).await.unwrap();
        assert_eq!(prompts[0].name, "alpha/greet");

        let body = fixture
            .aggregator
            .get_prompt(None, "alpha/greet", None)
            .await
            .unwrap();
        assert_eq!(body, json!({"messages": []}));

        let err = fixture
            .aggregator
            .get_prompt(None, "no-separator", None)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidParams(_)));
    }

    #[tokio::test]
    async fn downstream_tool_error_passes_through_unmodified() {
        // Listed but never answered: the fake child returns its own
        // JSON-RPC error payload for the call.
        let mut catalog = FakeCatalog::default();
        catalog.tools.push(McpTool::new("flaky"));

        let fixture =
            fixture(FakeConnector::default().with_catalog("alpha", catalog)).await;
        add_and_start(&fixture, "alpha").await;

        fixture.aggregator.list_tools(None).await.unwrap();
        let err = fixture
            .aggregator
            .call_tool(None, "flaky", json!({}))
            .await
            .unwrap_err();

        match err {
            GatewayError::Downstream { code, message, .. } => {
                assert_eq!(code, -32602);
                assert_eq!(message, "unknown tool: flaky");
            }
            other => panic!("unexpected error: {other}"),
        }

        let records = fixture.repos.audit.records();
        let last = records.last().unwrap();
        assert_eq!(last.status, OperationStatus::Error);
        assert!(last.error.as_deref().unwrap().contains("flaky"));
    }

    #[tokio::test]
    async fn every_operation_lands_in_the_audit_trail() {
        let fixture = fixture(FakeConnector::default().with_catalog(
            "alpha",
            FakeCatalog::default()
                .with_tool("build", text_result("ok"))
                .with_resource("notes://doc", vec![json!({"text": "doc"})]),
        ))
        .await;
        add_and_start(&fixture, "alpha").await;

        fixture.aggregator.list_tools(None).await.unwrap();
        fixture
            .aggregator
            .call_tool(None, "build", json!({"api_token": "s3cret"}))
            .await
            .unwrap();
        fixture.aggregator.list_resources(None).await.unwrap();
        fixture
            .aggregator
            .read_resource(None, "resource://alpha/doc")
            .await
            .unwrap();

        let records = fixture.repos.audit.records();
        let operations: Vec<&str> = records.iter().map(|r| r.operation.as_str()).collect();
        assert_eq!(
            operations,
            vec!["list_tools", "call_tool", "list_resources", "read_resource"]
        );
        assert!(records.iter().all(|r| r.client_id == "owner"));

        // Credentials in tool arguments never reach the store.
        let call = &records[1];
        assert_eq!(call.params.as_ref().unwrap()["arguments"]["api_token"], "[redacted]");
    }
}
