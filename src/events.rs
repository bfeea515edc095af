//! Lifecycle event publishing for chunk runs.
//!
//! Events are passive observability: publishing with no subscribers is not an
//! error and verdicts are never decided by listeners.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Lifecycle events emitted by the chunk orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BatchEvent {
    RunStarted {
        run_id: Uuid,
    },
    ChunkCommitted {
        run_id: Uuid,
        chunk_index: u64,
        written: usize,
    },
    ChunkRolledBack {
        run_id: Uuid,
        chunk_index: u64,
        reason: String,
    },
    ItemSkipped {
        run_id: Uuid,
        chunk_index: u64,
        item: String,
        cause: String,
    },
    RunCompleted {
        run_id: Uuid,
        chunks_committed: u64,
        skip_count: u32,
    },
    RunAborted {
        run_id: Uuid,
        cause: String,
    },
}

/// Event that has been published.
#[derive(Debug, Clone)]
pub struct PublishedEvent {
    pub event: BatchEvent,
    pub published_at: DateTime<Utc>,
}

/// Broadcast publisher for run lifecycle events.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<PublishedEvent>,
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a lifecycle event.
    pub async fn publish(&self, event: BatchEvent) {
        let published = PublishedEvent {
            event,
            published_at: Utc::now(),
        };

        // A send error means there are no subscribers, which is acceptable.
        let _ = self.sender.send(published);
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.sender.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_without_subscribers_is_ok() {
        let publisher = EventPublisher::default();
        publisher
            .publish(BatchEvent::RunStarted {
                run_id: Uuid::new_v4(),
            })
            .await;
        assert_eq!(publisher.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let publisher = EventPublisher::new(16);
        let mut rx = publisher.subscribe();

        let run_id = Uuid::new_v4();
        publisher
            .publish(BatchEvent::ChunkCommitted {
                run_id,
                chunk_index: 3,
                written: 7,
            })
            .await;

        let received = rx.recv().await.unwrap();
        match received.event {
            BatchEvent::ChunkCommitted {
                run_id: id,
                chunk_index,
                written,
            } => {
                assert_eq!(id, run_id);
                assert_eq!(chunk_index, 3);
                assert_eq!(written, 7);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn events_serialize_with_snake_case_tags() {
        let event = BatchEvent::RunAborted {
            run_id: Uuid::nil(),
            cause: "fatal".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"run_aborted\""));
    }
}
