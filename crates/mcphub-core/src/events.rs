//! Application events broadcast to listening UI layers.

use serde::{Deserialize, Serialize};

/// Events emitted by the gateway for UI consumption.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    ServerAdded {
        server_id: i64,
        name: String,
    },
    ServerRemoved {
        server_id: i64,
    },
    ServerStarted {
        server_id: i64,
        name: String,
    },
    ServerStopped {
        server_id: i64,
        name: String,
    },
    ServerError {
        server_id: Option<i64>,
        name: String,
        message: String,
    },
    TokenIssued {
        client_id: String,
    },
    TokenRevoked {
        client_id: String,
    },
    WorkspaceSwitched {
        workspace_id: i64,
        name: String,
    },
}

impl AppEvent {
    pub fn server_added(server_id: i64, name: impl Into<String>) -> Self {
        Self::ServerAdded {
            server_id,
            name: name.into(),
        }
    }

    pub const fn server_removed(server_id: i64) -> Self {
        Self::ServerRemoved { server_id }
    }

    pub fn server_started(server_id: i64, name: impl Into<String>) -> Self {
        Self::ServerStarted {
            server_id,
            name: name.into(),
        }
    }

    pub fn server_stopped(server_id: i64, name: impl Into<String>) -> Self {
        Self::ServerStopped {
            server_id,
            name: name.into(),
        }
    }

    pub fn server_error(
        server_id: Option<i64>,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ServerError {
            server_id,
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn workspace_switched(workspace_id: i64, name: impl Into<String>) -> Self {
        Self::WorkspaceSwitched {
            workspace_id,
            name: name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let event = AppEvent::server_started(3, "alpha");
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"server_started\""));
        assert!(json.contains("\"name\":\"alpha\""));
    }
}
