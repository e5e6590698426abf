//! Event emitter trait for cross-crate event broadcasting.
//!
//! Implementations handle transport details (broadcast channels, SSE, etc.).

use crate::events::AppEvent;

/// Trait for emitting application events.
///
/// Keeps channel types out of the public API surface. Implementations must
/// not block.
pub trait AppEventEmitter: Send + Sync {
    /// Emit an application event.
    fn emit(&self, event: AppEvent);
}

/// A no-op event emitter for tests and headless contexts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEmitter;

impl NoopEmitter {
    pub const fn new() -> Self {
        Self
    }
}

impl AppEventEmitter for NoopEmitter {
    fn emit(&self, _event: AppEvent) {
        // Intentionally do nothing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn noop_emitter_discards_events() {
        let emitter: Arc<dyn AppEventEmitter> = Arc::new(NoopEmitter::new());
        emitter.emit(AppEvent::server_removed(1));
    }
}
