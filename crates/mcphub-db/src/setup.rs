//! Database setup and initialization.
//!
//! Two separate SQLite databases exist: the per-workspace store (servers,
//! tokens, audit log) and the small registry database that tracks the
//! workspaces themselves. Entry points resolve the paths and call the setup
//! functions here.

use anyhow::Result;
use sqlx::{sqlite::SqliteConnectOptions, SqlitePool};
use std::path::Path;

/// Open (creating if missing) a workspace store and ensure its schema.
///
/// Safe to call repeatedly; all statements use IF NOT EXISTS.
pub async fn setup_database(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let pool = SqlitePool::connect_with(
        SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .foreign_keys(true),
    )
    .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Open (creating if missing) the workspace registry database.
pub async fn setup_registry_database(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let pool = SqlitePool::connect_with(
        SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true),
    )
    .await?;

    create_registry_schema(&pool).await?;

    Ok(pool)
}

/// Set up an in-memory workspace store for testing.
#[cfg(any(test, feature = "test-utils"))]
pub async fn setup_test_database() -> Result<SqlitePool> {
    let pool = SqlitePool::connect("sqlite::memory:").await?;
    create_schema(&pool).await?;
    Ok(pool)
}

/// Set up an in-memory registry database for testing.
#[cfg(any(test, feature = "test-utils"))]
pub async fn setup_test_registry_database() -> Result<SqlitePool> {
    let pool = SqlitePool::connect("sqlite::memory:").await?;
    create_registry_schema(&pool).await?;
    Ok(pool)
}

/// Creates the complete workspace store schema.
async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // Child server configurations
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS mcp_servers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            transport TEXT NOT NULL CHECK (transport IN ('stdio', 'sse', 'streamable-http')),
            enabled INTEGER NOT NULL DEFAULT 1,
            auto_start INTEGER NOT NULL DEFAULT 0,
            command TEXT,
            args TEXT NOT NULL DEFAULT '[]',
            url TEXT,
            bearer_token TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            last_error TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Environment variables for stdio servers
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS mcp_server_env (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            server_id INTEGER NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            FOREIGN KEY (server_id) REFERENCES mcp_servers(id) ON DELETE CASCADE,
            UNIQUE(server_id, key)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_mcp_env_server ON mcp_server_env(server_id)")
        .execute(pool)
        .await?;

    // Bearer tokens; the token string itself is the primary key
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS api_tokens (
            id TEXT PRIMARY KEY NOT NULL,
            client_id TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tokens_client ON api_tokens(client_id)")
        .execute(pool)
        .await?;

    // Per-token server grant lists
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS token_server_grants (
            token_id TEXT NOT NULL,
            server_id INTEGER NOT NULL,
            PRIMARY KEY (token_id, server_id),
            FOREIGN KEY (token_id) REFERENCES api_tokens(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Append-only audit log
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audit_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            created_at TEXT NOT NULL,
            client_id TEXT NOT NULL,
            server_id INTEGER,
            server_name TEXT,
            operation TEXT NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('ok', 'error')),
            duration_ms INTEGER NOT NULL,
            params TEXT,
            error TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Covering index for keyset pagination (newest first)
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_audit_cursor ON audit_log(created_at, id)")
        .execute(pool)
        .await?;

    run_migrations(pool).await?;

    Ok(())
}

/// Applies additive schema migrations, keyed by a migration-id ledger so
/// each one runs at most once per store.
async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            id TEXT PRIMARY KEY NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Stores created before servers tracked their last start failure.
    // Fresh stores already carry the column from CREATE TABLE.
    if !applied(pool, "0001_mcp_servers_last_error").await? {
        let _ = sqlx::query("ALTER TABLE mcp_servers ADD COLUMN last_error TEXT")
            .execute(pool)
            .await;
        // Ignore error if column already exists
        mark_applied(pool, "0001_mcp_servers_last_error").await?;
    }

    // Stores created before audit records captured redacted parameters.
    if !applied(pool, "0002_audit_log_params").await? {
        let _ = sqlx::query("ALTER TABLE audit_log ADD COLUMN params TEXT")
            .execute(pool)
            .await;
        mark_applied(pool, "0002_audit_log_params").await?;
    }

    Ok(())
}

async fn applied(pool: &SqlitePool, id: &str) -> Result<bool> {
    let row: Option<(String,)> = sqlx::query_as("SELECT id FROM schema_migrations WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

async fn mark_applied(pool: &SqlitePool, id: &str) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_migrations (id) VALUES (?)")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Creates the workspace registry schema.
async fn create_registry_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS workspaces (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            kind TEXT NOT NULL CHECK (kind IN ('local', 'remote')),
            active INTEGER NOT NULL DEFAULT 0,
            store TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_setup_test_database() {
        let pool = setup_test_database().await.unwrap();

        // Verify tables exist by querying them
        let _: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM mcp_servers")
            .fetch_one(&pool)
            .await
            .unwrap();

        let _: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM api_tokens")
            .fetch_one(&pool)
            .await
            .unwrap();

        let _: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM token_server_grants")
            .fetch_one(&pool)
            .await
            .unwrap();

        let _: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM audit_log")
            .fetch_one(&pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_migration_ledger_records_applied_ids() {
        let pool = setup_test_database().await.unwrap();

        let ids: Vec<(String,)> =
            sqlx::query_as("SELECT id FROM schema_migrations ORDER BY id")
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0].0, "0001_mcp_servers_last_error");

        // Running the schema again is a no-op.
        create_schema(&pool).await.unwrap();
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM schema_migrations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 2);
    }

    #[tokio::test]
    async fn test_setup_registry_database() {
        let pool = setup_test_registry_database().await.unwrap();

        let _: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM workspaces")
            .fetch_one(&pool)
            .await
            .unwrap();
    }
}
