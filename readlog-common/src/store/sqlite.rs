//! SQLite book store
//!
//! Each book is stored as its canonical JSON document keyed by
//! `(user_id, id)`. A write replaces the whole document; there is no
//! transaction across records.

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::{debug, error};

use super::BookStore;
use crate::events::{EventBus, LibraryEvent};
use crate::models::CanonicalBook;
use crate::Result;

pub struct SqliteBookStore {
    pool: SqlitePool,
    events: EventBus,
}

impl SqliteBookStore {
    /// The pool must already carry the `books` table (see `db::init_database`)
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_event_bus(pool, EventBus::default())
    }

    pub fn with_event_bus(pool: SqlitePool, events: EventBus) -> Self {
        Self { pool, events }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn publish(&self, user_id: &str) {
        if self.events.subscriber_count() == 0 {
            return;
        }
        match self.list(user_id).await {
            Ok(books) => self
                .events
                .emit_lossy(LibraryEvent::collection_changed(user_id, books)),
            Err(e) => error!(user_id = %user_id, error = %e, "Failed to reload collection after write"),
        }
    }
}

fn decode(document: &str) -> Result<CanonicalBook> {
    Ok(serde_json::from_str(document)?)
}

#[async_trait]
impl BookStore for SqliteBookStore {
    async fn save(&self, user_id: &str, book: &CanonicalBook) -> Result<()> {
        let document = serde_json::to_string(book)?;

        sqlx::query(
            r#"
            INSERT INTO books (user_id, id, title, created_at, updated_at, document)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, id) DO UPDATE SET
                title = excluded.title,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at,
                document = excluded.document
            "#,
        )
        .bind(user_id)
        .bind(&book.id)
        .bind(&book.title)
        .bind(book.created_at)
        .bind(book.updated_at)
        .bind(&document)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(user_id = %user_id, book_id = %book.id, error = %e, "Failed to save book");
            e
        })?;

        debug!(user_id = %user_id, book_id = %book.id, "Saved book");
        self.publish(user_id).await;
        Ok(())
    }

    async fn delete(&self, user_id: &str, book_id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM books WHERE user_id = ? AND id = ?")
            .bind(user_id)
            .bind(book_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!(user_id = %user_id, book_id = %book_id, error = %e, "Failed to delete book");
                e
            })?;

        if result.rows_affected() > 0 {
            debug!(user_id = %user_id, book_id = %book_id, "Deleted book");
            self.publish(user_id).await;
        }
        Ok(())
    }

    async fn list(&self, user_id: &str) -> Result<Vec<CanonicalBook>> {
        let documents: Vec<String> = sqlx::query_scalar(
            "SELECT document FROM books WHERE user_id = ? ORDER BY created_at DESC, id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        documents.iter().map(|d| decode(d)).collect()
    }

    async fn get(&self, user_id: &str, book_id: &str) -> Result<Option<CanonicalBook>> {
        let document: Option<String> =
            sqlx::query_scalar("SELECT document FROM books WHERE user_id = ? AND id = ?")
                .bind(user_id)
                .bind(book_id)
                .fetch_optional(&self.pool)
                .await?;

        document.as_deref().map(decode).transpose()
    }

    fn events(&self) -> &EventBus {
        &self.events
    }
}
