//! Persistence port for bearer tokens and their server grants.

use async_trait::async_trait;

use super::RepositoryError;
use crate::domain::token::ApiToken;

/// CRUD over tokens plus the grant-list maintenance the registry relies on.
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Insert a fully formed token (id already generated by the caller).
    async fn insert(&self, token: &ApiToken) -> Result<(), RepositoryError>;

    /// Look up a token by its secret id.
    async fn get(&self, token_id: &str) -> Result<ApiToken, RepositoryError>;

    async fn list(&self) -> Result<Vec<ApiToken>, RepositoryError>;

    async fn delete(&self, token_id: &str) -> Result<(), RepositoryError>;

    /// Delete every token owned by a client. Returns the number removed.
    async fn delete_for_client(&self, client_id: &str) -> Result<u64, RepositoryError>;

    /// Grant a newly added server to every existing token.
    async fn grant_to_all(&self, server_id: i64) -> Result<(), RepositoryError>;

    /// Strip a removed server from every token's grant list.
    async fn revoke_from_all(&self, server_id: i64) -> Result<(), RepositoryError>;
}
