//! Audit record domain types.
//!
//! One record is appended per completed aggregated operation, successful or
//! not. Records are immutable once written. Pagination uses an opaque cursor
//! encoding `(timestamp, id)` so pages stay stable under concurrent inserts.

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of aggregated operation being audited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    ListTools,
    CallTool,
    ListResources,
    ReadResource,
    ListResourceTemplates,
    ListPrompts,
    GetPrompt,
}

impl OperationKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ListTools => "list_tools",
            Self::CallTool => "call_tool",
            Self::ListResources => "list_resources",
            Self::ReadResource => "read_resource",
            Self::ListResourceTemplates => "list_resource_templates",
            Self::ListPrompts => "list_prompts",
            Self::GetPrompt => "get_prompt",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "list_tools" => Self::ListTools,
            "call_tool" => Self::CallTool,
            "list_resources" => Self::ListResources,
            "read_resource" => Self::ReadResource,
            "list_resource_templates" => Self::ListResourceTemplates,
            "list_prompts" => Self::ListPrompts,
            "get_prompt" => Self::GetPrompt,
            _ => return None,
        })
    }
}

/// Outcome of an audited operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Ok,
    Error,
}

impl OperationStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}

/// An audit record ready to be appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAuditRecord {
    pub client_id: String,
    pub server_id: Option<i64>,
    pub server_name: Option<String>,
    pub operation: OperationKind,
    pub status: OperationStatus,
    pub duration_ms: i64,
    /// Parameters with credential material already stripped.
    pub params: Option<serde_json::Value>,
    pub error: Option<String>,
}

/// A persisted, immutable audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub client_id: String,
    pub server_id: Option<i64>,
    pub server_name: Option<String>,
    pub operation: OperationKind,
    pub status: OperationStatus,
    pub duration_ms: i64,
    pub params: Option<serde_json::Value>,
    pub error: Option<String>,
}

/// Opaque pagination cursor encoding `(created_at, id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditCursor {
    pub created_at: DateTime<Utc>,
    pub id: i64,
}

impl AuditCursor {
    /// Encode to the opaque wire form.
    pub fn encode(&self) -> String {
        let raw = format!("{}|{}", self.created_at.timestamp_micros(), self.id);
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(raw.as_bytes())
    }

    /// Decode from the opaque wire form.
    pub fn decode(s: &str) -> Option<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(s.as_bytes())
            .ok()?;
        let raw = String::from_utf8(bytes).ok()?;
        let (ts, id) = raw.split_once('|')?;
        let micros: i64 = ts.parse().ok()?;
        Some(Self {
            created_at: DateTime::from_timestamp_micros(micros)?,
            id: id.parse().ok()?,
        })
    }
}

/// One page of audit records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditPage {
    pub records: Vec<AuditRecord>,
    /// Cursor for the next page, absent when this is the last page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// One bucket of a grouped count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountBucket {
    pub key: String,
    pub count: i64,
}

/// Derived aggregate views over the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditStats {
    pub by_client: Vec<CountBucket>,
    pub by_server: Vec<CountBucket>,
    pub by_operation: Vec<CountBucket>,
}
