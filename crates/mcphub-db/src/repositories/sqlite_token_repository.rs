//! `SQLite` implementation of the token repository.
//!
//! Grants live in a separate `token_server_grants` table so that adding or
//! removing a child server is one statement against all tokens at once.

use async_trait::async_trait;
use sqlx::SqlitePool;

use mcphub_core::{ApiToken, RepositoryError, TokenRepository};

use super::{map_sqlx_error, parse_datetime};

/// `SQLite` implementation of the token repository.
pub struct SqliteTokenRepository {
    pool: SqlitePool,
}

impl SqliteTokenRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_grants(&self, token_id: &str) -> Result<Vec<i64>, RepositoryError> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT server_id FROM token_server_grants WHERE token_id = ? ORDER BY server_id",
        )
        .bind(token_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

#[derive(sqlx::FromRow)]
struct TokenRow {
    id: String,
    client_id: String,
    created_at: String,
}

#[async_trait]
impl TokenRepository for SqliteTokenRepository {
    async fn insert(&self, token: &ApiToken) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO api_tokens (id, client_id, created_at) VALUES (?, ?, ?)")
            .bind(&token.id)
            .bind(&token.client_id)
            .bind(token.created_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        for server_id in &token.server_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO token_server_grants (token_id, server_id) VALUES (?, ?)",
            )
            .bind(&token.id)
            .bind(server_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        }

        Ok(())
    }

    async fn get(&self, token_id: &str) -> Result<ApiToken, RepositoryError> {
        let row = sqlx::query_as::<_, TokenRow>(
            "SELECT id, client_id, created_at FROM api_tokens WHERE id = ?",
        )
        .bind(token_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .ok_or_else(|| RepositoryError::NotFound("token".to_string()))?;

        let server_ids = self.fetch_grants(&row.id).await?;

        Ok(ApiToken {
            id: row.id,
            client_id: row.client_id,
            created_at: parse_datetime(&row.created_at),
            server_ids,
        })
    }

    async fn list(&self) -> Result<Vec<ApiToken>, RepositoryError> {
        let rows = sqlx::query_as::<_, TokenRow>(
            "SELECT id, client_id, created_at FROM api_tokens ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let mut tokens = Vec::with_capacity(rows.len());
        for row in rows {
            let server_ids = self.fetch_grants(&row.id).await?;
            tokens.push(ApiToken {
                id: row.id,
                client_id: row.client_id,
                created_at: parse_datetime(&row.created_at),
                server_ids,
            });
        }

        Ok(tokens)
    }

    async fn delete(&self, token_id: &str) -> Result<(), RepositoryError> {
        // Grants go via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM api_tokens WHERE id = ?")
            .bind(token_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound("token".to_string()));
        }

        Ok(())
    }

    async fn delete_for_client(&self, client_id: &str) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM api_tokens WHERE client_id = ?")
            .bind(client_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn grant_to_all(&self, server_id: i64) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO token_server_grants (token_id, server_id)
            SELECT id, ? FROM api_tokens
            "#,
        )
        .bind(server_id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn revoke_from_all(&self, server_id: i64) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM token_server_grants WHERE server_id = ?")
            .bind(server_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::setup_test_database;
    use chrono::Utc;

    async fn test_repo() -> SqliteTokenRepository {
        let pool = setup_test_database().await.unwrap();
        SqliteTokenRepository::new(pool)
    }

    fn token(id: &str, client: &str, server_ids: Vec<i64>) -> ApiToken {
        ApiToken {
            id: id.to_string(),
            client_id: client.to_string(),
            created_at: Utc::now(),
            server_ids,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let repo = test_repo().await;

        repo.insert(&token("mcph_abc", "cursor", vec![1, 2]))
            .await
            .unwrap();

        let fetched = repo.get("mcph_abc").await.unwrap();
        assert_eq!(fetched.client_id, "cursor");
        assert_eq!(fetched.server_ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_get_unknown_is_not_found() {
        let repo = test_repo().await;
        let result = repo.get("nope").await;
        assert!(matches!(result, Err(RepositoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_duplicate_token_id_conflicts() {
        let repo = test_repo().await;

        repo.insert(&token("mcph_dup", "a", vec![])).await.unwrap();
        let result = repo.insert(&token("mcph_dup", "b", vec![])).await;
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_delete_for_client_removes_all() {
        let repo = test_repo().await;

        repo.insert(&token("t1", "cursor", vec![1])).await.unwrap();
        repo.insert(&token("t2", "cursor", vec![2])).await.unwrap();
        repo.insert(&token("t3", "zed", vec![1])).await.unwrap();

        let removed = repo.delete_for_client("cursor").await.unwrap();
        assert_eq!(removed, 2);

        assert!(repo.get("t1").await.is_err());
        assert!(repo.get("t2").await.is_err());
        assert!(repo.get("t3").await.is_ok());
    }

    #[tokio::test]
    async fn test_grant_to_all_reaches_every_token() {
        let repo = test_repo().await;

        repo.insert(&token("t1", "a", vec![1])).await.unwrap();
        repo.insert(&token("t2", "b", vec![])).await.unwrap();

        repo.grant_to_all(7).await.unwrap();

        assert_eq!(repo.get("t1").await.unwrap().server_ids, vec![1, 7]);
        assert_eq!(repo.get("t2").await.unwrap().server_ids, vec![7]);
    }

    #[tokio::test]
    async fn test_revoke_from_all_strips_grants() {
        let repo = test_repo().await;

        repo.insert(&token("t1", "a", vec![1, 7])).await.unwrap();
        repo.insert(&token("t2", "b", vec![7])).await.unwrap();

        repo.revoke_from_all(7).await.unwrap();

        assert_eq!(repo.get("t1").await.unwrap().server_ids, vec![1]);
        assert!(repo.get("t2").await.unwrap().server_ids.is_empty());
    }

    #[tokio::test]
    async fn test_list_returns_all_tokens() {
        let repo = test_repo().await;

        repo.insert(&token("t1", "a", vec![])).await.unwrap();
        repo.insert(&token("t2", "b", vec![3])).await.unwrap();

        let tokens = repo.list().await.unwrap();
        assert_eq!(tokens.len(), 2);
    }
}
