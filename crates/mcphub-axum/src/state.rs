//! Shared application state type.

use std::sync::Arc;

use mcphub_gateway::{AppContext, WorkspaceCoordinator};

use crate::events::SseBroadcaster;
use crate::sessions::SessionManager;

/// State shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub context: Arc<AppContext>,
    pub workspaces: Arc<WorkspaceCoordinator>,
    pub events: Arc<SseBroadcaster>,
    pub sessions: Arc<SessionManager>,
}
