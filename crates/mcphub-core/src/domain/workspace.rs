//! Workspace domain types.
//!
//! A workspace is an isolated, swappable bundle of configuration, token and
//! audit state. Exactly one workspace is active at a time; switching tears
//! down and rebuilds every stateful service against the new backing store.

use serde::{Deserialize, Serialize};

/// Kind of backing store a workspace points at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkspaceKind {
    /// Local SQLite file under the data directory.
    #[default]
    Local,
    /// Remote store reachable via a connection URL.
    Remote,
}

impl WorkspaceKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "remote" => Self::Remote,
            _ => Self::Local,
        }
    }
}

/// A registered workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    pub id: i64,
    pub name: String,
    pub kind: WorkspaceKind,
    /// Exactly one workspace carries this flag at a time.
    pub active: bool,
    /// Path (local) or connection URL (remote) of the backing store.
    pub store: String,
}

/// A workspace that has not been registered yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWorkspace {
    pub name: String,
    pub kind: WorkspaceKind,
    pub store: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips() {
        assert_eq!(WorkspaceKind::parse("local"), WorkspaceKind::Local);
        assert_eq!(WorkspaceKind::parse("remote"), WorkspaceKind::Remote);
        assert_eq!(WorkspaceKind::Remote.as_str(), "remote");
    }
}
