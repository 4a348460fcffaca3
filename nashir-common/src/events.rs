//! Event types for the newsroom event system
//!
//! Provides shared event definitions and EventBus for all services.
//! Events are broadcast in-process and serialized for SSE transmission
//! to connected editorial and reader clients.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Platform event types
///
/// Shared across all services; every variant carries the row guid(s) it
/// concerns plus a timestamp, so SSE clients can update without a
/// follow-up fetch for the common cases.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NashirEvent {
    /// An article entered the published state
    ///
    /// Triggers:
    /// - SSE: Prepend to live feeds
    /// - Smart blocks: Refresh matching widgets
    ArticlePublished {
        article_id: String,
        slug: String,
        title: String,
        language: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A published article was withdrawn from the site
    ArticleArchived {
        article_id: String,
        slug: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Featured flag toggled on a published article
    ArticleFeatured {
        article_id: String,
        featured: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// New message in a newsroom chat channel
    ///
    /// Triggers:
    /// - SSE: Append to open chat panes
    ChatMessagePosted {
        message_id: String,
        channel_id: String,
        sender_id: String,
        sender_name: String,
        body: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Site-wide announcement went live
    AnnouncementPublished {
        announcement_id: String,
        title: String,
        level: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Task moved between board columns
    TaskStatusChanged {
        task_id: String,
        old_status: String,
        new_status: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A different theme became the active one
    ///
    /// Triggers:
    /// - SSE: Connected clients re-fetch design tokens
    ThemeActivated {
        theme_id: String,
        name: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl NashirEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            NashirEvent::ArticlePublished { .. } => "ArticlePublished",
            NashirEvent::ArticleArchived { .. } => "ArticleArchived",
            NashirEvent::ArticleFeatured { .. } => "ArticleFeatured",
            NashirEvent::ChatMessagePosted { .. } => "ChatMessagePosted",
            NashirEvent::AnnouncementPublished { .. } => "AnnouncementPublished",
            NashirEvent::TaskStatusChanged { .. } => "TaskStatusChanged",
            NashirEvent::ThemeActivated { .. } => "ThemeActivated",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus for application-wide events
///
/// Uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use nashir_common::events::{EventBus, NashirEvent};
/// use std::sync::Arc;
///
/// let event_bus = Arc::new(EventBus::new(1000));
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(NashirEvent::ArticlePublished {
///     article_id: "a1".to_string(),
///     slug: "budget-2026".to_string(),
///     title: "Budget approved".to_string(),
///     language: "en".to_string(),
///     timestamp: chrono::Utc::now(),
/// });
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<NashirEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<NashirEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` when no one is listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: NashirEvent,
    ) -> Result<usize, broadcast::error::SendError<NashirEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// The normal emit path for handlers: an empty newsroom is not an
    /// error condition.
    pub fn emit_lossy(&self, event: NashirEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> NashirEvent {
        NashirEvent::ArticlePublished {
            article_id: "a1".to_string(),
            slug: "test".to_string(),
            title: "Test".to_string(),
            language: "ar".to_string(),
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_event_bus_capacity() {
        let bus = EventBus::new(100);
        assert_eq!(bus.capacity(), 100);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_emit_reaches_subscriber() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();

        bus.emit(sample_event()).unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_type(), "ArticlePublished");
    }

    #[test]
    fn test_emit_without_subscribers_errors() {
        let bus = EventBus::new(10);
        assert!(bus.emit(sample_event()).is_err());
        // emit_lossy must not panic in the same situation
        bus.emit_lossy(sample_event());
    }

    #[test]
    fn test_event_serialization_tags_type() {
        let json = serde_json::to_string(&sample_event()).unwrap();
        assert!(json.contains("\"type\":\"ArticlePublished\""));
        assert!(json.contains("\"slug\":\"test\""));
    }

    #[tokio::test]
    async fn test_multiple_subscribers_each_receive() {
        let bus = EventBus::new(10);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.emit(NashirEvent::ThemeActivated {
            theme_id: "t1".to_string(),
            name: "Night".to_string(),
            timestamp: chrono::Utc::now(),
        })
        .unwrap();

        assert_eq!(rx1.recv().await.unwrap().event_type(), "ThemeActivated");
        assert_eq!(rx2.recv().await.unwrap().event_type(), "ThemeActivated");
    }
}
