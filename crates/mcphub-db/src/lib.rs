//! SQLite persistence adapters for mcphub.
//!
//! Implements the repository ports from `mcphub-core` on top of two
//! databases: the per-workspace store (servers, tokens, audit log) and the
//! workspace registry.

mod repositories;
mod setup;

pub use repositories::{
    SqliteAuditRepository, SqliteServerRepository, SqliteTokenRepository,
    SqliteWorkspaceRepository,
};
pub use setup::{setup_database, setup_registry_database};

#[cfg(any(test, feature = "test-utils"))]
pub use setup::{setup_test_database, setup_test_registry_database};

pub use sqlx::SqlitePool;
