//! `SQLite` implementation of the child server repository.
//!
//! Environment variable values are stored base64-encoded in a separate
//! table. This is encoding, not encryption - a follow-up task should add
//! proper at-rest protection.

use async_trait::async_trait;
use base64::Engine;
use sqlx::SqlitePool;

use mcphub_core::{
    EnvEntry, McpServer, NewMcpServer, RepositoryError, ServerConfig, ServerRepository,
    TransportKind,
};

use super::{map_sqlx_error, parse_datetime};

/// `SQLite` implementation of the child server repository.
pub struct SqliteServerRepository {
    pool: SqlitePool,
}

impl SqliteServerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal row types for database queries
// ─────────────────────────────────────────────────────────────────────────────

#[derive(sqlx::FromRow)]
struct ServerRow {
    id: i64,
    name: String,
    transport: String,
    enabled: bool,
    auto_start: bool,
    command: Option<String>,
    args: Option<String>,
    url: Option<String>,
    bearer_token: Option<String>,
    created_at: String,
    last_error: Option<String>,
}

#[derive(sqlx::FromRow)]
struct EnvRow {
    key: String,
    value: String,
}

const SERVER_COLUMNS: &str = "id, name, transport, enabled, auto_start, command, args, url, \
                              bearer_token, created_at, last_error";

// ─────────────────────────────────────────────────────────────────────────────
// Helper functions
// ─────────────────────────────────────────────────────────────────────────────

fn row_to_server(row: ServerRow, env: Vec<EnvEntry>) -> McpServer {
    let args: Option<Vec<String>> = row.args.and_then(|a| serde_json::from_str(&a).ok());

    let config = ServerConfig {
        command: row.command,
        args,
        url: row.url,
        bearer_token: row.bearer_token,
    };

    McpServer {
        id: row.id,
        name: row.name,
        transport: TransportKind::parse(&row.transport),
        config,
        enabled: row.enabled,
        auto_start: row.auto_start,
        env,
        created_at: parse_datetime(&row.created_at),
        last_error: row.last_error,
    }
}

/// Decode a base64-encoded environment variable value.
fn decode_env_value(encoded: &str) -> Result<String, RepositoryError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| RepositoryError::Internal(format!("Failed to decode env var: {e}")))?;

    String::from_utf8(bytes)
        .map_err(|e| RepositoryError::Internal(format!("Invalid UTF-8 in env var: {e}")))
}

/// Encode an environment variable value to base64.
fn encode_env_value(value: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(value.as_bytes())
}

fn args_to_json(args: Option<&Vec<String>>) -> String {
    args.map_or_else(
        || "[]".to_string(),
        |a| serde_json::to_string(a).unwrap_or_else(|_| "[]".to_string()),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl ServerRepository for SqliteServerRepository {
    async fn insert(&self, server: NewMcpServer) -> Result<McpServer, RepositoryError> {
        let args_json = args_to_json(server.config.args.as_ref());

        let result = sqlx::query(
            r#"
            INSERT INTO mcp_servers (name, transport, enabled, auto_start, command, args, url, bearer_token)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&server.name)
        .bind(server.transport.as_str())
        .bind(server.enabled)
        .bind(server.auto_start)
        .bind(&server.config.command)
        .bind(&args_json)
        .bind(&server.config.url)
        .bind(&server.config.bearer_token)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let server_id = result.last_insert_rowid();

        for entry in &server.env {
            let encoded_value = encode_env_value(&entry.value);

            sqlx::query("INSERT INTO mcp_server_env (server_id, key, value) VALUES (?, ?, ?)")
                .bind(server_id)
                .bind(&entry.key)
                .bind(&encoded_value)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        }

        self.get_by_id(server_id).await
    }

    async fn get_by_id(&self, id: i64) -> Result<McpServer, RepositoryError> {
        let row = sqlx::query_as::<_, ServerRow>(&format!(
            "SELECT {SERVER_COLUMNS} FROM mcp_servers WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;

        let env = self.fetch_env(id).await?;

        Ok(row_to_server(row, env))
    }

    async fn get_by_name(&self, name: &str) -> Result<McpServer, RepositoryError> {
        let row = sqlx::query_as::<_, ServerRow>(&format!(
            "SELECT {SERVER_COLUMNS} FROM mcp_servers WHERE name = ?"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .ok_or_else(|| RepositoryError::NotFound(name.to_string()))?;

        let env = self.fetch_env(row.id).await?;

        Ok(row_to_server(row, env))
    }

    async fn list(&self) -> Result<Vec<McpServer>, RepositoryError> {
        let rows = sqlx::query_as::<_, ServerRow>(&format!(
            "SELECT {SERVER_COLUMNS} FROM mcp_servers ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let mut servers = Vec::with_capacity(rows.len());
        for row in rows {
            let env = self.fetch_env(row.id).await?;
            servers.push(row_to_server(row, env));
        }

        Ok(servers)
    }

    async fn update(&self, server: &McpServer) -> Result<(), RepositoryError> {
        // Verify server exists
        let _ = self.get_by_id(server.id).await?;

        let args_json = args_to_json(server.config.args.as_ref());

        sqlx::query(
            r#"
            UPDATE mcp_servers
            SET name = ?, transport = ?, enabled = ?, auto_start = ?, command = ?, args = ?, url = ?, bearer_token = ?, last_error = ?
            WHERE id = ?
            "#,
        )
        .bind(&server.name)
        .bind(server.transport.as_str())
        .bind(server.enabled)
        .bind(server.auto_start)
        .bind(&server.config.command)
        .bind(&args_json)
        .bind(&server.config.url)
        .bind(&server.config.bearer_token)
        .bind(&server.last_error)
        .bind(server.id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        // Atomic env replacement: delete all and re-insert
        sqlx::query("DELETE FROM mcp_server_env WHERE server_id = ?")
            .bind(server.id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        for entry in &server.env {
            let encoded_value = encode_env_value(&entry.value);

            sqlx::query("INSERT INTO mcp_server_env (server_id, key, value) VALUES (?, ?, ?)")
                .bind(server.id)
                .bind(&entry.key)
                .bind(&encoded_value)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        }

        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        // Verify server exists
        let _ = self.get_by_id(id).await?;

        // Env vars are deleted via ON DELETE CASCADE
        sqlx::query("DELETE FROM mcp_servers WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn set_last_error(&self, id: i64, error: Option<String>) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE mcp_servers SET last_error = ? WHERE id = ?")
            .bind(&error)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id.to_string()));
        }

        Ok(())
    }
}

impl SqliteServerRepository {
    /// Fetch and decode environment variables for a server.
    async fn fetch_env(&self, server_id: i64) -> Result<Vec<EnvEntry>, RepositoryError> {
        let rows = sqlx::query_as::<_, EnvRow>(
            "SELECT key, value FROM mcp_server_env WHERE server_id = ?",
        )
        .bind(server_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let mut env = Vec::with_capacity(rows.len());
        for row in rows {
            let decoded_value = decode_env_value(&row.value)?;
            env.push(EnvEntry::new(row.key, decoded_value));
        }

        Ok(env)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::setup_test_database;

    async fn test_repo() -> SqliteServerRepository {
        let pool = setup_test_database().await.unwrap();
        SqliteServerRepository::new(pool)
    }

    #[tokio::test]
    async fn test_insert_and_get_by_id() {
        let repo = test_repo().await;

        let new_server =
            NewMcpServer::stdio("test-server", "npx", vec!["-y".to_string(), "mcp".to_string()])
                .with_env("API_KEY", "secret123");

        let server = repo.insert(new_server).await.unwrap();

        assert_eq!(server.name, "test-server");
        assert_eq!(server.transport, TransportKind::Stdio);
        assert_eq!(server.config.command, Some("npx".to_string()));
        assert_eq!(server.env.len(), 1);
        assert_eq!(server.env[0].key, "API_KEY");
        assert_eq!(server.env[0].value, "secret123");

        let fetched = repo.get_by_id(server.id).await.unwrap();
        assert_eq!(fetched.name, "test-server");
        assert_eq!(fetched.env[0].value, "secret123");
    }

    #[tokio::test]
    async fn test_env_values_stored_encoded() {
        let repo = test_repo().await;

        let server = repo
            .insert(NewMcpServer::stdio("enc", "cmd", vec![]).with_env("KEY", "plaintext"))
            .await
            .unwrap();

        let (stored,): (String,) =
            sqlx::query_as("SELECT value FROM mcp_server_env WHERE server_id = ?")
                .bind(server.id)
                .fetch_one(&repo.pool)
                .await
                .unwrap();

        assert_ne!(stored, "plaintext");
        assert_eq!(decode_env_value(&stored).unwrap(), "plaintext");
    }

    #[tokio::test]
    async fn test_get_by_name() {
        let repo = test_repo().await;

        repo.insert(NewMcpServer::stdio("my-mcp", "node", vec!["server.js".to_string()]))
            .await
            .unwrap();

        let fetched = repo.get_by_name("my-mcp").await.unwrap();
        assert_eq!(fetched.name, "my-mcp");
    }

    #[tokio::test]
    async fn test_list_ordered_by_name() {
        let repo = test_repo().await;

        repo.insert(NewMcpServer::stdio("server-b", "cmd", vec![]))
            .await
            .unwrap();
        repo.insert(NewMcpServer::stdio("server-a", "cmd", vec![]))
            .await
            .unwrap();

        let servers = repo.list().await.unwrap();
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0].name, "server-a");
        assert_eq!(servers[1].name, "server-b");
    }

    #[tokio::test]
    async fn test_update_server() {
        let repo = test_repo().await;

        let new_server =
            NewMcpServer::stdio("updatable", "old-cmd", vec![]).with_env("KEY", "old-value");
        let mut server = repo.insert(new_server).await.unwrap();

        server.config.command = Some("new-cmd".to_string());
        server.env = vec![EnvEntry::new("KEY", "new-value")];
        server.enabled = false;

        repo.update(&server).await.unwrap();

        let fetched = repo.get_by_id(server.id).await.unwrap();
        assert_eq!(fetched.config.command, Some("new-cmd".to_string()));
        assert_eq!(fetched.env[0].value, "new-value");
        assert!(!fetched.enabled);
    }

    #[tokio::test]
    async fn test_delete_server() {
        let repo = test_repo().await;

        let server = repo
            .insert(NewMcpServer::stdio("deletable", "cmd", vec![]))
            .await
            .unwrap();
        let id = server.id;

        repo.delete(id).await.unwrap();

        let result = repo.get_by_id(id).await;
        assert!(matches!(result, Err(RepositoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_conflict_on_duplicate_name() {
        let repo = test_repo().await;

        repo.insert(NewMcpServer::stdio("unique-name", "cmd", vec![]))
            .await
            .unwrap();

        let result = repo
            .insert(NewMcpServer::stdio("unique-name", "cmd", vec![]))
            .await;

        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_remote_server_round_trip() {
        let repo = test_repo().await;

        let new_server = NewMcpServer::streamable_http("remote", "http://localhost:3001/mcp")
            .with_bearer_token("tok123");
        let server = repo.insert(new_server).await.unwrap();

        assert_eq!(server.transport, TransportKind::StreamableHttp);
        assert_eq!(
            server.config.url,
            Some("http://localhost:3001/mcp".to_string())
        );
        assert_eq!(server.config.bearer_token, Some("tok123".to_string()));
    }

    #[tokio::test]
    async fn test_set_last_error() {
        let repo = test_repo().await;

        let server = repo
            .insert(NewMcpServer::stdio("failing", "cmd", vec![]))
            .await
            .unwrap();

        repo.set_last_error(server.id, Some("spawn failed".to_string()))
            .await
            .unwrap();
        let fetched = repo.get_by_id(server.id).await.unwrap();
        assert_eq!(fetched.last_error, Some("spawn failed".to_string()));

        repo.set_last_error(server.id, None).await.unwrap();
        let fetched = repo.get_by_id(server.id).await.unwrap();
        assert!(fetched.last_error.is_none());

        let missing = repo.set_last_error(9999, None).await;
        assert!(matches!(missing, Err(RepositoryError::NotFound(_))));
    }
}
