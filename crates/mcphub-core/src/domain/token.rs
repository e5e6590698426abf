//! Bearer token domain types.
//!
//! A token is the sole access-control surface: its server-id list decides
//! which child servers the holding client may reach. The list is kept in
//! sync as servers are added (auto-granted) and removed (stripped).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bearer credential issued to one external application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiToken {
    /// The secret-bearing token string itself (also the primary key).
    pub id: String,

    /// Identifier of the owning client application (e.g. "cursor").
    pub client_id: String,

    /// When the token was issued.
    pub created_at: DateTime<Utc>,

    /// Ids of the child servers this token may reach.
    pub server_ids: Vec<i64>,
}

impl ApiToken {
    /// Whether this token grants access to the given server.
    pub fn has_access(&self, server_id: i64) -> bool {
        self.server_ids.contains(&server_id)
    }
}

/// Request to issue a new token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewApiToken {
    /// Identifier of the owning client application.
    pub client_id: String,

    /// Server ids to grant. Empty means "grant all currently configured".
    #[serde(default)]
    pub server_ids: Vec<i64>,
}
