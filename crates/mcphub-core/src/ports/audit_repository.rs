//! Persistence port for the append-only audit log.

use async_trait::async_trait;

use super::RepositoryError;
use crate::domain::audit::{AuditCursor, AuditPage, AuditStats, NewAuditRecord};

/// Append-only audit log with cursor pagination and aggregate views.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Append one record. Returns the assigned id.
    async fn insert(&self, record: &NewAuditRecord) -> Result<i64, RepositoryError>;

    /// One page of records, newest first, starting after the cursor.
    async fn page(
        &self,
        limit: u32,
        cursor: Option<AuditCursor>,
    ) -> Result<AuditPage, RepositoryError>;

    /// Counts grouped by client, server and operation kind.
    async fn stats(&self) -> Result<AuditStats, RepositoryError>;
}
