//! `SQLite` implementation of the append-only audit log.
//!
//! Timestamps are written as RFC 3339 with microsecond precision so that
//! keyset pagination can compare them lexicographically.

use async_trait::async_trait;
use chrono::SecondsFormat;
use sqlx::SqlitePool;

use mcphub_core::{
    AuditCursor, AuditPage, AuditRecord, AuditRepository, AuditStats, CountBucket, NewAuditRecord,
    OperationKind, OperationStatus, RepositoryError,
};

use super::{map_sqlx_error, parse_datetime};

/// `SQLite` implementation of the audit repository.
pub struct SqliteAuditRepository {
    pool: SqlitePool,
}

impl SqliteAuditRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct AuditRow {
    id: i64,
    created_at: String,
    client_id: String,
    server_id: Option<i64>,
    server_name: Option<String>,
    operation: String,
    status: String,
    duration_ms: i64,
    params: Option<String>,
    error: Option<String>,
}

fn row_to_record(row: AuditRow) -> AuditRecord {
    AuditRecord {
        id: row.id,
        created_at: parse_datetime(&row.created_at),
        client_id: row.client_id,
        server_id: row.server_id,
        server_name: row.server_name,
        operation: OperationKind::parse(&row.operation).unwrap_or(OperationKind::ListTools),
        status: if row.status == "error" {
            OperationStatus::Error
        } else {
            OperationStatus::Ok
        },
        duration_ms: row.duration_ms,
        params: row.params.and_then(|p| serde_json::from_str(&p).ok()),
        error: row.error,
    }
}

fn timestamp_text(dt: chrono::DateTime<chrono::Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

const AUDIT_COLUMNS: &str = "id, created_at, client_id, server_id, server_name, operation, \
                             status, duration_ms, params, error";

#[async_trait]
impl AuditRepository for SqliteAuditRepository {
    async fn insert(&self, record: &NewAuditRecord) -> Result<i64, RepositoryError> {
        let params_json = record
            .params
            .as_ref()
            .map(|p| serde_json::to_string(p).unwrap_or_else(|_| "null".to_string()));

        let result = sqlx::query(
            r#"
            INSERT INTO audit_log (created_at, client_id, server_id, server_name, operation, status, duration_ms, params, error)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(timestamp_text(chrono::Utc::now()))
        .bind(&record.client_id)
        .bind(record.server_id)
        .bind(&record.server_name)
        .bind(record.operation.as_str())
        .bind(record.status.as_str())
        .bind(record.duration_ms)
        .bind(&params_json)
        .bind(&record.error)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.last_insert_rowid())
    }

    async fn page(
        &self,
        limit: u32,
        cursor: Option<AuditCursor>,
    ) -> Result<AuditPage, RepositoryError> {
        // Fetch one extra row to decide whether another page exists.
        let fetch = i64::from(limit) + 1;

        let rows = if let Some(cursor) = cursor {
            let anchor = timestamp_text(cursor.created_at);
            sqlx::query_as::<_, AuditRow>(&format!(
                r#"
                SELECT {AUDIT_COLUMNS} FROM audit_log
                WHERE created_at < ? OR (created_at = ? AND id < ?)
                ORDER BY created_at DESC, id DESC
                LIMIT ?
                "#
            ))
            .bind(&anchor)
            .bind(&anchor)
            .bind(cursor.id)
            .bind(fetch)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, AuditRow>(&format!(
                "SELECT {AUDIT_COLUMNS} FROM audit_log ORDER BY created_at DESC, id DESC LIMIT ?"
            ))
            .bind(fetch)
            .fetch_all(&self.pool)
            .await
        }
        .map_err(map_sqlx_error)?;

        let has_more = rows.len() > limit as usize;
        let records: Vec<AuditRecord> = rows
            .into_iter()
            .take(limit as usize)
            .map(row_to_record)
            .collect();

        let next_cursor = if has_more {
            records.last().map(|last| {
                AuditCursor {
                    created_at: last.created_at,
                    id: last.id,
                }
                .encode()
            })
        } else {
            None
        };

        Ok(AuditPage {
            records,
            next_cursor,
        })
    }

    async fn stats(&self) -> Result<AuditStats, RepositoryError> {
        let by_client = self
            .grouped_counts("SELECT client_id AS key, COUNT(*) AS count FROM audit_log GROUP BY client_id ORDER BY count DESC")
            .await?;
        let by_server = self
            .grouped_counts(
                "SELECT COALESCE(server_name, '') AS key, COUNT(*) AS count FROM audit_log \
                 WHERE server_name IS NOT NULL GROUP BY server_name ORDER BY count DESC",
            )
            .await?;
        let by_operation = self
            .grouped_counts("SELECT operation AS key, COUNT(*) AS count FROM audit_log GROUP BY operation ORDER BY count DESC")
            .await?;

        Ok(AuditStats {
            by_client,
            by_server,
            by_operation,
        })
    }
}

impl SqliteAuditRepository {
    async fn grouped_counts(&self, sql: &str) -> Result<Vec<CountBucket>, RepositoryError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|(key, count)| CountBucket { key, count })
            .collect())
    }
}
