//! Library events
//!
//! Each store instance owns its own `EventBus`; there is no process-wide
//! listener list. Every write publishes the user's full collection, so a
//! subscriber that falls behind only needs the most recent snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::models::{CanonicalBook, ImportOutcome};

/// Default channel capacity for a store's event bus
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Library event types
///
/// Serialized with a `type` tag for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LibraryEvent {
    /// A user's collection changed
    ///
    /// Carries the complete collection after the write, newest first.
    CollectionChanged {
        user_id: String,
        books: Vec<CanonicalBook>,
        timestamp: DateTime<Utc>,
    },

    /// A batch import ran to completion
    ImportCompleted {
        user_id: String,
        inserted_count: usize,
        updated_count: usize,
        timestamp: DateTime<Utc>,
    },
}

impl LibraryEvent {
    pub fn collection_changed(user_id: &str, books: Vec<CanonicalBook>) -> Self {
        LibraryEvent::CollectionChanged {
            user_id: user_id.to_string(),
            books,
            timestamp: Utc::now(),
        }
    }

    pub fn import_completed(user_id: &str, outcome: ImportOutcome) -> Self {
        LibraryEvent::ImportCompleted {
            user_id: user_id.to_string(),
            inserted_count: outcome.inserted_count,
            updated_count: outcome.updated_count,
            timestamp: Utc::now(),
        }
    }

    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            LibraryEvent::CollectionChanged { .. } => "CollectionChanged",
            LibraryEvent::ImportCompleted { .. } => "ImportCompleted",
        }
    }

    /// User the event belongs to
    pub fn user_id(&self) -> &str {
        match self {
            LibraryEvent::CollectionChanged { user_id, .. }
            | LibraryEvent::ImportCompleted { user_id, .. } => user_id,
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Event distribution bus owned by one store instance
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block writers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LibraryEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<LibraryEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: LibraryEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

// ========================================
// Collection subscriptions
// ========================================

/// One delivery on a collection subscription
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionUpdate {
    /// Full collection, newest first
    Snapshot(Vec<CanonicalBook>),
    /// A batch import for this user finished
    ImportCompleted(ImportOutcome),
}

/// Stream of one user's collection snapshots
///
/// The first delivery is the collection as loaded at subscription time;
/// each later delivery follows a write. Dropping the subscription
/// unsubscribes.
pub struct CollectionSubscription {
    user_id: String,
    initial: Option<Vec<CanonicalBook>>,
    rx: broadcast::Receiver<LibraryEvent>,
}

impl CollectionSubscription {
    /// `rx` must be subscribed before `initial` is loaded so that no write
    /// can fall between the two.
    pub fn new(
        user_id: &str,
        initial: Vec<CanonicalBook>,
        rx: broadcast::Receiver<LibraryEvent>,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            initial: Some(initial),
            rx,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Next collection snapshot, or `None` once the store is gone
    ///
    /// Import completions are skipped.
    pub async fn next(&mut self) -> Option<Vec<CanonicalBook>> {
        loop {
            match self.next_update().await? {
                CollectionUpdate::Snapshot(books) => return Some(books),
                CollectionUpdate::ImportCompleted(_) => continue,
            }
        }
    }

    /// Next snapshot or import completion for this user
    pub async fn next_update(&mut self) -> Option<CollectionUpdate> {
        if let Some(initial) = self.initial.take() {
            return Some(CollectionUpdate::Snapshot(initial));
        }

        loop {
            match self.rx.recv().await {
                Ok(event) if event.user_id() != self.user_id => continue,
                Ok(LibraryEvent::CollectionChanged { books, .. }) => {
                    return Some(CollectionUpdate::Snapshot(books));
                }
                Ok(LibraryEvent::ImportCompleted {
                    inserted_count,
                    updated_count,
                    ..
                }) => {
                    return Some(CollectionUpdate::ImportCompleted(ImportOutcome {
                        inserted_count,
                        updated_count,
                    }));
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // A newer snapshot is still queued
                    warn!(
                        user_id = %self.user_id,
                        skipped,
                        "Collection subscriber lagged; skipping to newer snapshot"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(user_id = %self.user_id, "Event bus closed");
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{book_type, ReadingStatus};

    fn book(title: &str) -> CanonicalBook {
        CanonicalBook {
            id: title.to_string(),
            title: title.to_string(),
            author: "a".to_string(),
            status: ReadingStatus::ToRead,
            rating: 0.0,
            review: String::new(),
            quotes: vec![],
            book_type: book_type::COMIC.to_string(),
            keywords: vec![],
            is_favorite: false,
            read_at: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_eventbus_new() {
        let bus = EventBus::new(100);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_eventbus_emit_without_subscribers_is_silent() {
        let bus = EventBus::new(4);
        bus.emit_lossy(LibraryEvent::collection_changed("u", vec![]));
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_separate_buses_are_isolated() {
        let a = EventBus::new(4);
        let b = EventBus::new(4);
        let mut rx_b = b.subscribe();

        a.emit_lossy(LibraryEvent::collection_changed("u", vec![book("x")]));
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn test_event_type_and_user() {
        let event = LibraryEvent::import_completed(
            "alice",
            ImportOutcome {
                inserted_count: 1,
                updated_count: 2,
            },
        );
        assert_eq!(event.event_type(), "ImportCompleted");
        assert_eq!(event.user_id(), "alice");

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ImportCompleted");
        assert_eq!(json["updated_count"], 2);
    }

    #[tokio::test]
    async fn test_subscription_delivers_initial_then_own_user_changes() {
        let bus = EventBus::new(16);
        let mut sub = CollectionSubscription::new("alice", vec![book("first")], bus.subscribe());

        bus.emit_lossy(LibraryEvent::collection_changed("bob", vec![book("other")]));
        bus.emit_lossy(LibraryEvent::import_completed("alice", ImportOutcome::default()));
        bus.emit_lossy(LibraryEvent::collection_changed(
            "alice",
            vec![book("second"), book("first")],
        ));

        let initial = sub.next().await.unwrap();
        assert_eq!(initial[0].title, "first");

        let next = sub.next().await.unwrap();
        assert_eq!(next.len(), 2);
        assert_eq!(next[0].title, "second");
    }

    #[tokio::test]
    async fn test_subscription_recovers_from_lag() {
        let bus = EventBus::new(2);
        let mut sub = CollectionSubscription::new("alice", vec![], bus.subscribe());
        assert!(sub.next().await.unwrap().is_empty());

        for i in 0..5 {
            bus.emit_lossy(LibraryEvent::collection_changed(
                "alice",
                vec![book(&format!("b{}", i))],
            ));
        }

        let books = sub.next().await.unwrap();
        assert_eq!(books[0].title, "b3");
        let books = sub.next().await.unwrap();
        assert_eq!(books[0].title, "b4");
    }

    #[tokio::test]
    async fn test_subscription_ends_when_bus_dropped() {
        let bus = EventBus::new(2);
        let mut sub = CollectionSubscription::new("alice", vec![], bus.subscribe());
        drop(bus);
        assert!(sub.next().await.is_some());
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn test_next_update_forwards_own_import_completion() {
        let bus = EventBus::new(16);
        let mut sub = CollectionSubscription::new("alice", vec![], bus.subscribe());
        let outcome = ImportOutcome {
            inserted_count: 3,
            updated_count: 1,
        };

        bus.emit_lossy(LibraryEvent::import_completed("bob", ImportOutcome::default()));
        bus.emit_lossy(LibraryEvent::import_completed("alice", outcome));

        assert_eq!(
            sub.next_update().await.unwrap(),
            CollectionUpdate::Snapshot(vec![])
        );
        assert_eq!(
            sub.next_update().await.unwrap(),
            CollectionUpdate::ImportCompleted(outcome)
        );
    }
}
