//! Axum HTTP adapter for mcphub.
//!
//! Exposes the aggregated MCP surface (streamable HTTP, SSE with a
//! companion message endpoint), the management API and the application
//! event stream, plus the composition root that wires SQLite storage and
//! the MCP connector together.

pub mod auth;
pub mod bootstrap;
pub mod error;
pub mod events;
pub mod handlers;
pub mod routes;
pub mod rpc;
pub mod sessions;
pub mod state;

pub use bootstrap::{build_state, serve, ServeConfig, SqliteStoreOpener};
pub use error::HttpError;
pub use events::SseBroadcaster;
pub use routes::create_router;
pub use state::AppState;
