//! Token validation and issuance.
//!
//! The token's server-id list is the sole access-control surface. Every
//! rejection path (missing token, unknown token, unknown server name,
//! out-of-scope server) surfaces the same generic `invalid request` error;
//! the distinct internal reason is traced but never sent to the client.

use std::sync::Arc;

use mcphub_core::{
    ApiToken, AppEvent, AppEventEmitter, AuthError, GatewayError, NewApiToken, RepositoryError,
    TokenRepository,
};

use crate::registry::ServerRegistry;

/// Client id attributed to tokenless (local management) callers.
pub const OWNER_CLIENT_ID: &str = "owner";

/// Validates bearer tokens and answers scoping questions for the aggregator.
pub struct TokenValidator {
    tokens: Arc<dyn TokenRepository>,
    registry: Arc<ServerRegistry>,
    emitter: Arc<dyn AppEventEmitter>,
}

impl TokenValidator {
    pub fn new(
        tokens: Arc<dyn TokenRepository>,
        registry: Arc<ServerRegistry>,
        emitter: Arc<dyn AppEventEmitter>,
    ) -> Self {
        Self {
            tokens,
            registry,
            emitter,
        }
    }

    /// Look up a presented token. Unknown tokens get the generic rejection.
    pub async fn validate(&self, token_id: &str) -> Result<ApiToken, GatewayError> {
        match self.tokens.get(token_id).await {
            Ok(token) => Ok(token),
            Err(RepositoryError::NotFound(_)) => {
                let err = AuthError::unknown_token();
                tracing::debug!(reason = err.reason(), "Rejected token");
                Err(GatewayError::Auth(err))
            }
            Err(other) => Err(GatewayError::Repository(other)),
        }
    }

    /// Whether a token grants access to the given server id.
    pub fn has_access(token: &ApiToken, server_id: i64) -> bool {
        token.has_access(server_id)
    }

    /// The combined check run on every aggregated operation targeting a
    /// named server. Returns `(server_id, client_id)` for dispatch and audit
    /// attribution.
    ///
    /// An absent token means the local unrestricted owner; it still fails on
    /// unknown server names, but with a real `UnknownTarget` error since
    /// there is nothing to hide from the owner.
    pub async fn validate_and_authorize(
        &self,
        token_id: Option<&str>,
        server_name: &str,
    ) -> Result<(i64, String), GatewayError> {
        let server_id = self.registry.server_id(server_name).await;

        let Some(token_id) = token_id else {
            let id = server_id
                .ok_or_else(|| GatewayError::UnknownTarget(server_name.to_string()))?;
            return Ok((id, OWNER_CLIENT_ID.to_string()));
        };

        let token = self.validate(token_id).await?;

        let Some(server_id) = server_id else {
            let err = AuthError::unknown_server();
            tracing::debug!(
                reason = err.reason(),
                server_name = %server_name,
                client_id = %token.client_id,
                "Rejected request"
            );
            return Err(GatewayError::Auth(err));
        };

        if !token.has_access(server_id) {
            let err = AuthError::out_of_scope();
            tracing::debug!(
                reason = err.reason(),
                server_name = %server_name,
                client_id = %token.client_id,
                "Rejected request"
            );
            return Err(GatewayError::Auth(err));
        }

        Ok((server_id, token.client_id))
    }

    // =========================================================================
    // Issuance
    // =========================================================================

    /// Issue a new token. An empty server-id list grants every currently
    /// configured server.
    pub async fn issue(&self, request: NewApiToken) -> Result<ApiToken, GatewayError> {
        let server_ids = if request.server_ids.is_empty() {
            self.registry
                .list_servers()
                .await?
                .into_iter()
                .map(|s| s.id)
                .collect()
        } else {
            request.server_ids
        };

        let token = ApiToken {
            id: format!("mcph_{}", uuid::Uuid::new_v4().simple()),
            client_id: request.client_id,
            created_at: chrono::Utc::now(),
            server_ids,
        };

        self.tokens.insert(&token).await?;

        self.emitter.emit(AppEvent::TokenIssued {
            client_id: token.client_id.clone(),
        });
        tracing::info!(client_id = %token.client_id, "Issued token");

        Ok(token)
    }

    pub async fn list_tokens(&self) -> Result<Vec<ApiToken>, GatewayError> {
        Ok(self.tokens.list().await?)
    }

    /// Revoke one token by its secret id.
    pub async fn revoke(&self, token_id: &str) -> Result<(), GatewayError> {
        let token = self.tokens.get(token_id).await?;
        self.tokens.delete(token_id).await?;

        self.emitter.emit(AppEvent::TokenRevoked {
            client_id: token.client_id.clone(),
        });
        tracing::info!(client_id = %token.client_id, "Revoked token");
        Ok(())
    }

    /// Revoke every token owned by a client. Returns the number removed.
    pub async fn revoke_for_client(&self, client_id: &str) -> Result<u64, GatewayError> {
        let removed = self.tokens.delete_for_client(client_id).await?;

        if removed > 0 {
            self.emitter.emit(AppEvent::TokenRevoked {
                client_id: client_id.to_string(),
            });
        }
        tracing::info!(client_id = %client_id, removed, "Revoked tokens for client");
        Ok(removed)
    }
}
