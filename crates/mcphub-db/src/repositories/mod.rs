//! Repository implementations backed by `SQLite`.

mod sqlite_audit_repository;
mod sqlite_server_repository;
mod sqlite_token_repository;
mod sqlite_workspace_repository;

pub use sqlite_audit_repository::SqliteAuditRepository;
pub use sqlite_server_repository::SqliteServerRepository;
pub use sqlite_token_repository::SqliteTokenRepository;
pub use sqlite_workspace_repository::SqliteWorkspaceRepository;

use chrono::{DateTime, TimeZone, Utc};
use mcphub_core::RepositoryError;

/// Parse a datetime string from `SQLite` to a `DateTime<Utc>`.
///
/// Accepts both RFC 3339 (written by our inserts) and the
/// "YYYY-MM-DD HH:MM:SS" form produced by `datetime('now')` defaults.
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| Utc.from_utc_datetime(&dt))
        .unwrap_or_else(|_| Utc::now())
}

/// Map `SQLx` errors to `RepositoryError`.
pub(crate) fn map_sqlx_error(e: sqlx::Error) -> RepositoryError {
    let msg = e.to_string();
    if msg.contains("UNIQUE constraint failed") {
        return RepositoryError::Conflict(msg);
    }
    RepositoryError::Internal(msg)
}
