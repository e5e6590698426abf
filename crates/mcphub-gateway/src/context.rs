//! Application context: the service graph over one open workspace store.
//!
//! All stateful services (registry, validator, audit recorder, aggregator)
//! are bundled into one [`Services`] value built against a single backing
//! store. The context holds the currently installed bundle behind a lock;
//! while a workspace switch has the slot empty, every caller sees
//! `Unavailable` instead of stale state.

use std::sync::Arc;

use async_trait::async_trait;
use mcphub_core::{
    AppEventEmitter, AuditRepository, GatewayError, ServerConnector, ServerRepository,
    TokenRepository,
};
use tokio::sync::RwLock;

use crate::aggregator::Aggregator;
use crate::audit::AuditRecorder;
use crate::auth::TokenValidator;
use crate::registry::ServerRegistry;

/// Repository bundle backed by one workspace store.
#[derive(Clone)]
pub struct Stores {
    pub servers: Arc<dyn ServerRepository>,
    pub tokens: Arc<dyn TokenRepository>,
    pub audit: Arc<dyn AuditRepository>,
}

/// Opens the repository bundle behind a workspace's store locator, running
/// any pending schema migrations first.
#[async_trait]
pub trait StoreOpener: Send + Sync {
    async fn open(&self, store: &str) -> Result<Stores, GatewayError>;
}

/// Stateful services bound to one open workspace store. Rebuilt wholesale
/// on every workspace switch; nothing in here survives a switch.
pub struct Services {
    pub registry: Arc<ServerRegistry>,
    pub validator: Arc<TokenValidator>,
    pub audit: Arc<AuditRecorder>,
    pub aggregator: Arc<Aggregator>,
    tokens: Arc<dyn TokenRepository>,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}

impl Services {
    /// Assemble the full service graph over one store.
    pub fn build(
        stores: &Stores,
        connector: Arc<dyn ServerConnector>,
        emitter: Arc<dyn AppEventEmitter>,
    ) -> Arc<Self> {
        let registry = Arc::new(ServerRegistry::new(
            stores.servers.clone(),
            stores.tokens.clone(),
            connector,
            emitter.clone(),
        ));
        let validator = Arc::new(TokenValidator::new(
            stores.tokens.clone(),
            registry.clone(),
            emitter,
        ));
        let audit = Arc::new(AuditRecorder::new(stores.audit.clone()));
        let aggregator = Arc::new(Aggregator::new(
            registry.clone(),
            validator.clone(),
            audit.clone(),
        ));

        Arc::new(Self {
            registry,
            validator,
            audit,
            aggregator,
            tokens: stores.tokens.clone(),
        })
    }

    /// Additively grant every configured server to every existing token.
    ///
    /// Run when a workspace store is (re)opened so tokens issued earlier
    /// keep working against servers that became visible since. Idempotent.
    pub async fn resync_token_grants(&self) -> Result<(), GatewayError> {
        for server in self.registry.list_servers().await? {
            self.tokens.grant_to_all(server.id).await?;
        }
        Ok(())
    }
}

/// Shared application context handed to the HTTP layer.
pub struct AppContext {
    connector: Arc<dyn ServerConnector>,
    emitter: Arc<dyn AppEventEmitter>,
    opener: Arc<dyn StoreOpener>,
    services: RwLock<Option<Arc<Services>>>,
}

impl AppContext {
    pub fn new(
        connector: Arc<dyn ServerConnector>,
        emitter: Arc<dyn AppEventEmitter>,
        opener: Arc<dyn StoreOpener>,
    ) -> Self {
        Self {
            connector,
            emitter,
            opener,
            services: RwLock::new(None),
        }
    }

    pub fn emitter(&self) -> Arc<dyn AppEventEmitter> {
        self.emitter.clone()
    }

    /// Open a store and build (but do not install) services over it.
    pub async fn open(&self, store: &str) -> Result<Arc<Services>, GatewayError> {
        let stores = self.opener.open(store).await?;
        Ok(Services::build(
            &stores,
            self.connector.clone(),
            self.emitter.clone(),
        ))
    }

    /// Install a built service bundle as the live one.
    pub async fn install(&self, services: Arc<Services>) {
        *self.services.write().await = Some(services);
    }

    /// Take the live bundle down, leaving the context unavailable. Used at
    /// the start of a workspace switch.
    pub async fn take(&self) -> Option<Arc<Services>> {
        self.services.write().await.take()
    }

    /// The live service bundle. Rejected while a workspace switch is in
    /// flight.
    pub async fn services(&self) -> Result<Arc<Services>, GatewayError> {
        self.services.read().await.clone().ok_or_else(|| {
            GatewayError::Unavailable("workspace switch in progress".to_string())
        })
    }
}
