//! Gateway core for mcphub.
//!
//! Child server lifecycle, token auth, audit recording, the aggregation
//! core and workspace switching. Storage and transport stay behind the
//! ports defined in `mcphub-core`; this crate never touches SQL or HTTP.

pub mod agent_tools;
pub mod aggregator;
pub mod audit;
pub mod auth;
pub mod context;
pub mod registry;
pub mod workspace;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregator::Aggregator;
pub use audit::AuditRecorder;
pub use auth::{TokenValidator, OWNER_CLIENT_ID};
pub use context::{AppContext, Services, StoreOpener, Stores};
pub use registry::ServerRegistry;
pub use workspace::WorkspaceCoordinator;
