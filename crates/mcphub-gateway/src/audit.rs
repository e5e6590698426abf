//! Audit recording with credential redaction.
//!
//! One record is appended per completed aggregated operation. Parameter
//! payloads are scrubbed of credential-bearing keys before they reach the
//! store; the bearer token itself never appears in a record.

use std::sync::Arc;

use mcphub_core::{
    AuditCursor, AuditPage, AuditRepository, AuditStats, GatewayError, NewAuditRecord,
    OperationKind, OperationStatus,
};
use serde_json::Value;

/// Keys stripped (case-insensitively, by substring) from logged parameters.
const REDACTED_KEYS: [&str; 4] = ["token", "authorization", "bearer", "secret"];

/// Appends audit records and serves paginated queries over them.
pub struct AuditRecorder {
    repository: Arc<dyn AuditRepository>,
}

impl AuditRecorder {
    pub fn new(repository: Arc<dyn AuditRepository>) -> Self {
        Self { repository }
    }

    /// Append one record. Parameters are redacted here, not by callers.
    #[allow(clippy::too_many_arguments)]
    pub async fn record(
        &self,
        client_id: &str,
        server_id: Option<i64>,
        server_name: Option<&str>,
        operation: OperationKind,
        status: OperationStatus,
        duration_ms: i64,
        params: Option<&Value>,
        error: Option<String>,
    ) -> Result<(), GatewayError> {
        let record = NewAuditRecord {
            client_id: client_id.to_string(),
            server_id,
            server_name: server_name.map(str::to_string),
            operation,
            status,
            duration_ms,
            params: params.map(redact),
            error,
        };

        self.repository.insert(&record).await?;
        Ok(())
    }

    /// One page of records, newest first. The cursor is the opaque string
    /// from a previous page; malformed cursors are rejected.
    pub async fn page(
        &self,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<AuditPage, GatewayError> {
        let cursor = match cursor {
            Some(raw) => Some(
                AuditCursor::decode(raw)
                    .ok_or_else(|| GatewayError::InvalidParams("malformed cursor".to_string()))?,
            ),
            None => None,
        };

        Ok(self.repository.page(limit, cursor).await?)
    }

    /// Counts grouped by client, server and operation kind.
    pub async fn stats(&self) -> Result<AuditStats, GatewayError> {
        Ok(self.repository.stats().await?)
    }
}

/// Recursively strip credential-bearing keys from a parameter payload.
pub fn redact(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, inner) in map {
                let lower = key.to_lowercase();
                if REDACTED_KEYS.iter().any(|needle| lower.contains(needle)) {
                    out.insert(key.clone(), Value::String("[redacted]".to_string()));
                } else {
                    out.insert(key.clone(), redact(inner));
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryRepos;
    use serde_json::json;

    #[test]
    fn redact_strips_credential_keys_at_any_depth() {
        let params = json!({
            "name": "deploy",
            "arguments": {
                "api_token": "s3cret",
                "Authorization": "Bearer abc",
                "nested": [{"bearerToken": "x", "path": "/ok"}],
            },
        });

        let redacted = redact(&params);

        assert_eq!(redacted["name"], "deploy");
        assert_eq!(redacted["arguments"]["api_token"], "[redacted]");
        assert_eq!(redacted["arguments"]["Authorization"], "[redacted]");
        assert_eq!(redacted["arguments"]["nested"][0]["bearerToken"], "[redacted]");
        assert_eq!(redacted["arguments"]["nested"][0]["path"], "/ok");
    }

    #[tokio::test]
    async fn record_persists_redacted_params() {
        let repos = MemoryRepos::new();
        let recorder = AuditRecorder::new(repos.audit.clone());

        recorder
            .record(
                "cursor",
                Some(1),
                Some("alpha"),
                OperationKind::CallTool,
                OperationStatus::Ok,
                7,
                Some(&json!({"name": "echo", "token": "mcph_secret"})),
                None,
            )
            .await
            .unwrap();

        let records = repos.audit.records();
        assert_eq!(records.len(), 1);
        let params = records[0].params.as_ref().unwrap();
        assert_eq!(params["token"], "[redacted]");
        assert_eq!(params["name"], "echo");
        assert_eq!(records[0].server_name.as_deref(), Some("alpha"));
    }

    #[tokio::test]
    async fn malformed_cursor_is_invalid_params() {
        let repos = MemoryRepos::new();
        let recorder = AuditRecorder::new(repos.audit.clone());

        let err = recorder.page(10, Some("!!not-a-cursor!!")).await.unwrap_err();
        assert!(matches!(err, GatewayError::InvalidParams(_)));
    }
}
