//! Shared repository error type.

use thiserror::Error;

/// Errors surfaced by the persistence ports.
///
/// Storage failures are propagated, not swallowed, since they imply state
/// inconsistency the caller must see.
#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    /// Entity not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Unique constraint violation (e.g. duplicate server name).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Underlying storage failure.
    #[error("storage error: {0}")]
    Internal(String),
}
