//! SSE session bookkeeping.
//!
//! A `GET /sse` connection gets a fresh session id and a channel; responses
//! to messages posted against that session are pushed into the channel and
//! streamed back as SSE `message` events. Sessions die with their stream.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::mpsc;

const SESSION_BUFFER: usize = 64;

/// Live SSE sessions keyed by id.
#[derive(Default)]
pub struct SessionManager {
    sessions: Mutex<HashMap<String, mpsc::Sender<Value>>>,
}

impl SessionManager {
    /// The session table is valid even if a holder panicked mid-update.
    fn table(&self) -> MutexGuard<'_, HashMap<String, mpsc::Sender<Value>>> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a new session. Returns its id and the response receiver.
    pub fn open(&self) -> (String, mpsc::Receiver<Value>) {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let (sender, receiver) = mpsc::channel(SESSION_BUFFER);
        self.table().insert(id.clone(), sender);
        (id, receiver)
    }

    /// The response channel for a session, if it is still open.
    pub fn sender(&self, id: &str) -> Option<mpsc::Sender<Value>> {
        self.table().get(id).cloned()
    }

    pub fn close(&self, id: &str) {
        self.table().remove(id);
    }

    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Removes its session when the owning SSE stream is dropped.
pub struct SessionGuard {
    id: String,
    sessions: Arc<SessionManager>,
}

impl SessionGuard {
    pub fn new(id: String, sessions: Arc<SessionManager>) -> Self {
        Self { id, sessions }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.sessions.close(&self.id);
    }
}
