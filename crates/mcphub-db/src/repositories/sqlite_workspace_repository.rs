//! `SQLite` implementation of the workspace registry.
//!
//! Lives in its own small database file so the registry survives workspace
//! store swaps. `set_active` flips the flag in one transaction so exactly
//! one workspace is ever marked active.

use async_trait::async_trait;
use sqlx::SqlitePool;

use mcphub_core::{NewWorkspace, RepositoryError, Workspace, WorkspaceKind, WorkspaceRepository};

use super::map_sqlx_error;

/// `SQLite` implementation of the workspace registry.
pub struct SqliteWorkspaceRepository {
    pool: SqlitePool,
}

impl SqliteWorkspaceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct WorkspaceRow {
    id: i64,
    name: String,
    kind: String,
    active: bool,
    store: String,
}

fn row_to_workspace(row: WorkspaceRow) -> Workspace {
    Workspace {
        id: row.id,
        name: row.name,
        kind: WorkspaceKind::parse(&row.kind),
        active: row.active,
        store: row.store,
    }
}

#[async_trait]
impl WorkspaceRepository for SqliteWorkspaceRepository {
    async fn insert(&self, workspace: NewWorkspace) -> Result<Workspace, RepositoryError> {
        let result = sqlx::query("INSERT INTO workspaces (name, kind, store) VALUES (?, ?, ?)")
            .bind(&workspace.name)
            .bind(workspace.kind.as_str())
            .bind(&workspace.store)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        self.get(result.last_insert_rowid()).await
    }

    async fn get(&self, id: i64) -> Result<Workspace, RepositoryError> {
        let row = sqlx::query_as::<_, WorkspaceRow>(
            "SELECT id, name, kind, active, store FROM workspaces WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;

        Ok(row_to_workspace(row))
    }

    async fn list(&self) -> Result<Vec<Workspace>, RepositoryError> {
        let rows = sqlx::query_as::<_, WorkspaceRow>(
            "SELECT id, name, kind, active, store FROM workspaces ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(row_to_workspace).collect())
    }

    async fn active(&self) -> Result<Option<Workspace>, RepositoryError> {
        let row = sqlx::query_as::<_, WorkspaceRow>(
            "SELECT id, name, kind, active, store FROM workspaces WHERE active = 1 LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(row_to_workspace))
    }

    async fn set_active(&self, id: i64) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        sqlx::query("UPDATE workspaces SET active = (id = ?)")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        let activated: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM workspaces WHERE id = ? AND active = 1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;

        if activated.is_none() {
            // Unknown id: roll back rather than leaving nothing active.
            tx.rollback().await.map_err(map_sqlx_error)?;
            return Err(RepositoryError::NotFound(id.to_string()));
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM workspaces WHERE id = ?")
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
