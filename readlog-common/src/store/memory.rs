//! In-memory book store
//!
//! Backs demo sessions and tests. Each instance has its own collections and
//! its own event bus, so several stores can coexist in one process.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use super::{sort_newest_first, BookStore};
use crate::events::{EventBus, LibraryEvent};
use crate::models::CanonicalBook;
use crate::Result;

pub struct MemoryBookStore {
    collections: RwLock<HashMap<String, Vec<CanonicalBook>>>,
    events: EventBus,
}

impl MemoryBookStore {
    pub fn new() -> Self {
        Self::with_event_bus(EventBus::default())
    }

    pub fn with_event_bus(events: EventBus) -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            events,
        }
    }

    async fn snapshot(&self, user_id: &str) -> Vec<CanonicalBook> {
        let collections = self.collections.read().await;
        let mut books = collections.get(user_id).cloned().unwrap_or_default();
        sort_newest_first(&mut books);
        books
    }

    async fn publish(&self, user_id: &str) {
        if self.events.subscriber_count() == 0 {
            return;
        }
        let books = self.snapshot(user_id).await;
        self.events
            .emit_lossy(LibraryEvent::collection_changed(user_id, books));
    }
}

impl Default for MemoryBookStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BookStore for MemoryBookStore {
    async fn save(&self, user_id: &str, book: &CanonicalBook) -> Result<()> {
        {
            let mut collections = self.collections.write().await;
            let books = collections.entry(user_id.to_string()).or_default();
            match books.iter_mut().find(|b| b.id == book.id) {
                Some(slot) => *slot = book.clone(),
                None => books.insert(0, book.clone()),
            }
        }
        debug!(user_id = %user_id, book_id = %book.id, "Saved book (memory)");
        self.publish(user_id).await;
        Ok(())
    }

    async fn delete(&self, user_id: &str, book_id: &str) -> Result<()> {
        let removed = {
            let mut collections = self.collections.write().await;
            match collections.get_mut(user_id) {
                Some(books) => {
                    let before = books.len();
                    books.retain(|b| b.id != book_id);
                    books.len() != before
                }
                None => false,
            }
        };
        if removed {
            debug!(user_id = %user_id, book_id = %book_id, "Deleted book (memory)");
            self.publish(user_id).await;
        }
        Ok(())
    }

    async fn list(&self, user_id: &str) -> Result<Vec<CanonicalBook>> {
        Ok(self.snapshot(user_id).await)
    }

    async fn get(&self, user_id: &str, book_id: &str) -> Result<Option<CanonicalBook>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(user_id)
            .and_then(|books| books.iter().find(|b| b.id == book_id).cloned()))
    }

    fn events(&self) -> &EventBus {
        &self.events
    }
}
