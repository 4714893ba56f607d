//! Book persistence
//!
//! The backing store is an opaque per-user document collection: records are
//! created or replaced by id, deleted by id, and observed as whole-collection
//! snapshots. No transaction spans more than one record.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryBookStore;
pub use sqlite::SqliteBookStore;

use async_trait::async_trait;

use crate::events::{CollectionSubscription, EventBus};
use crate::models::CanonicalBook;
use crate::Result;

/// Per-user book collection store
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Create or replace the record with `book.id`
    async fn save(&self, user_id: &str, book: &CanonicalBook) -> Result<()>;

    /// Remove a record; removing an unknown id is not an error
    async fn delete(&self, user_id: &str, book_id: &str) -> Result<()>;

    /// Full collection, newest `createdAt` first
    async fn list(&self, user_id: &str) -> Result<Vec<CanonicalBook>>;

    /// Single record by id
    async fn get(&self, user_id: &str, book_id: &str) -> Result<Option<CanonicalBook>>;

    /// Event bus owned by this store instance
    fn events(&self) -> &EventBus;

    /// Observe the collection: the current contents first, then every change
    async fn subscribe(&self, user_id: &str) -> Result<CollectionSubscription> {
        let rx = self.events().subscribe();
        let initial = self.list(user_id).await?;
        Ok(CollectionSubscription::new(user_id, initial, rx))
    }
}

/// Order a collection newest first
pub(crate) fn sort_newest_first(books: &mut [CanonicalBook]) {
    books.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
