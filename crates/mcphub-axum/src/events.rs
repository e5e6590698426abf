//! SSE broadcaster for application events.
//!
//! Implements the core event emitter port over a broadcast channel, so the
//! registry and coordinator can emit events that stream to any number of
//! connected management UI clients.

use std::convert::Infallible;
use std::sync::Arc;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::Stream;
use mcphub_core::{AppEvent, AppEventEmitter};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Broadcasts application events to every subscribed SSE client.
#[derive(Debug, Clone)]
pub struct SseBroadcaster {
    sender: broadcast::Sender<AppEvent>,
}

impl SseBroadcaster {
    /// Slow clients miss events once this many are buffered.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn with_defaults() -> Self {
        Self::new(256)
    }

    /// SSE response streaming all future events to one client, with a
    /// keep-alive ping so proxies do not drop the connection.
    pub fn subscribe(
        self: Arc<Self>,
    ) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send + 'static> {
        let receiver = self.sender.subscribe();
        let stream = BroadcastStream::new(receiver).filter_map(|result| match result {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => Some(Ok(Event::default().data(json))),
                Err(err) => {
                    tracing::warn!(error = %err, "Failed to serialize event");
                    None
                }
            },
            Err(err) => {
                tracing::debug!(error = %err, "Event stream lagged");
                None
            }
        });

        Sse::new(stream).keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(30))
                .text("ping"),
        )
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl AppEventEmitter for SseBroadcaster {
    fn emit(&self, event: AppEvent) {
        // No subscribers is fine.
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_without_subscribers_does_not_panic() {
        let broadcaster = SseBroadcaster::with_defaults();
        assert_eq!(broadcaster.subscriber_count(), 0);
        broadcaster.emit(AppEvent::server_removed(1));
    }

    #[tokio::test]
    async fn subscriber_receives_emitted_events() {
        let broadcaster = SseBroadcaster::with_defaults();
        let mut receiver = broadcaster.sender.subscribe();

        broadcaster.emit(AppEvent::server_started(42, "alpha"));

        match receiver.recv().await.unwrap() {
            AppEvent::ServerStarted { server_id, name } => {
                assert_eq!(server_id, 42);
                assert_eq!(name, "alpha");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
