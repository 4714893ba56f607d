//! Import reconciliation against real stores
//!
//! Covers matching against the pre-batch snapshot, abort-without-rollback
//! and the export/re-import round trip.

use async_trait::async_trait;
use readlog_common::backup::export_json;
use readlog_common::events::EventBus;
use readlog_common::import::{
    import_json, import_legacy, import_records, legacy_books, reconcile_batch,
};
use readlog_common::models::{ImportOutcome, LEGACY_TAG};
use readlog_common::store::{BookStore, MemoryBookStore};
use readlog_common::{CanonicalBook, Error, ReadingStatus, ValidationError};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

const USER: &str = "reader-1";

/// Store whose saves start failing after `fail_after` successes
struct FlakyStore {
    inner: MemoryBookStore,
    saves: AtomicUsize,
    fail_after: usize,
}

impl FlakyStore {
    fn new(fail_after: usize) -> Self {
        Self {
            inner: MemoryBookStore::new(),
            saves: AtomicUsize::new(0),
            fail_after,
        }
    }
}

#[async_trait]
impl BookStore for FlakyStore {
    async fn save(&self, user_id: &str, book: &CanonicalBook) -> readlog_common::Result<()> {
        if self.saves.fetch_add(1, Ordering::SeqCst) >= self.fail_after {
            return Err(Error::Internal("backend unavailable".to_string()));
        }
        self.inner.save(user_id, book).await
    }

    async fn delete(&self, user_id: &str, book_id: &str) -> readlog_common::Result<()> {
        self.inner.delete(user_id, book_id).await
    }

    async fn list(&self, user_id: &str) -> readlog_common::Result<Vec<CanonicalBook>> {
        self.inner.list(user_id).await
    }

    async fn get(
        &self,
        user_id: &str,
        book_id: &str,
    ) -> readlog_common::Result<Option<CanonicalBook>> {
        self.inner.get(user_id, book_id).await
    }

    fn events(&self) -> &EventBus {
        self.inner.events()
    }
}

#[tokio::test]
async fn test_duplicates_within_batch_both_insert() {
    let store = MemoryBookStore::new();
    let items = vec![json!({"title": "Dune"}), json!({"title": "dune"})];

    let outcome = import_records(&store, USER, &items, None).await.unwrap();

    assert_eq!(
        outcome,
        ImportOutcome {
            inserted_count: 2,
            updated_count: 0
        }
    );
    assert_eq!(store.list(USER).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_match_is_trimmed_and_case_folded() {
    let store = MemoryBookStore::new();
    import_records(&store, USER, &[json!({"title": "dune", "rating": 3})], None)
        .await
        .unwrap();
    let original = store.list(USER).await.unwrap().remove(0);

    let outcome = import_records(&store, USER, &[json!({"title": " Dune ", "rating": 5})], None)
        .await
        .unwrap();

    assert_eq!(outcome.updated_count, 1);
    assert_eq!(outcome.inserted_count, 0);

    let books = store.list(USER).await.unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0].id, original.id);
    assert_eq!(books[0].created_at, original.created_at);
    assert_eq!(books[0].rating, 5.0);
}

#[tokio::test]
async fn test_missing_title_is_skipped_and_uncounted() {
    let store = MemoryBookStore::new();
    let items = vec![
        json!({"author": "nobody"}),
        json!({"title": ""}),
        json!(42),
        json!({"title": "Real"}),
    ];

    let outcome = import_records(&store, USER, &items, None).await.unwrap();
    assert_eq!(outcome.inserted_count, 1);
    assert_eq!(outcome.updated_count, 0);
}

#[tokio::test]
async fn test_legacy_import_is_idempotent_on_tag() {
    let store = MemoryBookStore::new();
    let seed_len = legacy_books().unwrap().len();

    let first = import_legacy(&store, USER).await.unwrap();
    assert_eq!(first.inserted_count, seed_len);

    let second = import_legacy(&store, USER).await.unwrap();
    assert_eq!(second.inserted_count, 0);
    assert_eq!(second.updated_count, seed_len);

    for book in store.list(USER).await.unwrap() {
        let tags = book.keywords.iter().filter(|k| *k == LEGACY_TAG).count();
        assert_eq!(tags, 1, "{} carries the legacy tag once", book.title);
    }
}

#[tokio::test]
async fn test_legacy_status_and_rating_mapping() {
    let store = MemoryBookStore::new();
    import_legacy(&store, USER).await.unwrap();
    let books = store.list(USER).await.unwrap();
    let by_title = |t: &str| books.iter().find(|b| b.title == t).unwrap().clone();

    assert_eq!(by_title("小王子").status, ReadingStatus::ToRead);
    assert_eq!(by_title("小王子").rating, 0.0);
    assert_eq!(by_title("西遊記").status, ReadingStatus::Completed);
    assert_eq!(by_title("西遊記").rating, 4.5);
    assert_eq!(by_title("百年孤寂").status, ReadingStatus::Reading);
    assert_eq!(by_title("異鄉人").status, ReadingStatus::Dropped);

    for book in &books {
        assert!((0.0..=5.0).contains(&book.rating));
        assert!(!book.author.is_empty());
    }
}

#[tokio::test]
async fn test_export_then_reimport_updates_everything_in_place() {
    let store = MemoryBookStore::new();
    import_records(
        &store,
        USER,
        &[
            json!({"title": "A", "author": "x", "rating": 4, "status": "完食", "keywords": ["k"]}),
            json!({"title": "B", "type": "漫畫", "quotes": ["q1"], "isFavorite": true}),
            json!({"title": "C", "status": "待閱", "review": "good", "readAt": 1700000000000i64}),
        ],
        None,
    )
    .await
    .unwrap();
    let before = store.list(USER).await.unwrap();

    let text = export_json(&before).unwrap();
    let outcome = import_json(&store, USER, &text).await.unwrap();

    assert_eq!(outcome.inserted_count, 0);
    assert_eq!(outcome.updated_count, before.len());

    let after = store.list(USER).await.unwrap();
    assert_eq!(after.len(), before.len());
    for (a, b) in before.iter().zip(after.iter()) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.title, b.title);
        assert_eq!(a.author, b.author);
        assert_eq!(a.status, b.status);
        assert_eq!(a.rating, b.rating);
        assert_eq!(a.review, b.review);
        assert_eq!(a.quotes, b.quotes);
        assert_eq!(a.book_type, b.book_type);
        assert_eq!(a.keywords, b.keywords);
        assert_eq!(a.is_favorite, b.is_favorite);
        assert_eq!(a.read_at, b.read_at);
        assert_eq!(a.created_at, b.created_at);
        assert!(b.updated_at >= a.updated_at);
    }
}

#[tokio::test]
async fn test_validation_failure_aborts_without_rollback() {
    let store = MemoryBookStore::new();
    let items = vec![
        json!({"title": "first"}),
        json!({"title": "second"}),
        json!({"title": "bad", "rating": 9}),
        json!({"title": "never written"}),
    ];

    let aborted = import_records(&store, USER, &items, None).await.unwrap_err();

    assert_eq!(aborted.completed.inserted_count, 2);
    assert!(matches!(
        aborted.cause,
        Error::Validation(ValidationError::RatingOutOfRange)
    ));

    let titles: Vec<_> = store
        .list(USER)
        .await
        .unwrap()
        .into_iter()
        .map(|b| b.title)
        .collect();
    assert_eq!(titles.len(), 2);
    assert!(titles.contains(&"first".to_string()));
    assert!(titles.contains(&"second".to_string()));
}

#[tokio::test]
async fn test_whitespace_title_aborts_on_validation() {
    let store = MemoryBookStore::new();
    let aborted = import_records(&store, USER, &[json!({"title": "   "})], None)
        .await
        .unwrap_err();
    assert!(matches!(
        aborted.cause,
        Error::Validation(ValidationError::MissingTitle)
    ));
}

#[tokio::test]
async fn test_store_failure_aborts_with_partial_counts() {
    let store = FlakyStore::new(1);
    let items = vec![json!({"title": "ok"}), json!({"title": "boom"}), json!({"title": "skip"})];

    let aborted = import_records(&store, USER, &items, None).await.unwrap_err();

    assert_eq!(aborted.completed.inserted_count, 1);
    assert!(matches!(aborted.cause, Error::Internal(_)));
    assert_eq!(store.list(USER).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_malformed_json_writes_nothing() {
    let store = MemoryBookStore::new();
    let aborted = import_json(&store, USER, "{ not json").await.unwrap_err();
    assert_eq!(aborted.completed, ImportOutcome::default());
    assert!(matches!(aborted.cause, Error::Parse(_)));

    let aborted = import_json(&store, USER, r#"{"title": "A"}"#).await.unwrap_err();
    assert!(matches!(aborted.cause, Error::Parse(_)));
    assert!(store.list(USER).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_persist_calls_are_sequential_and_ordered() {
    let seen = Mutex::new(Vec::new());
    let items = vec![json!({"title": "1"}), json!({"title": "2"}), json!({"title": "3"})];

    let outcome = reconcile_batch(
        &items,
        &[],
        |book| {
            seen.lock().unwrap().push(book.title.clone());
            async { Ok(()) }
        },
        Some("tag"),
    )
    .await
    .unwrap();

    assert_eq!(outcome.inserted_count, 3);
    assert_eq!(*seen.lock().unwrap(), vec!["1", "2", "3"]);
}

#[tokio::test]
async fn test_import_announces_completion() {
    let store = MemoryBookStore::new();
    let mut rx = store.events().subscribe();

    import_records(&store, USER, &[json!({"title": "A"})], None)
        .await
        .unwrap();

    let mut saw_completion = false;
    while let Ok(event) = rx.try_recv() {
        if event.event_type() == "ImportCompleted" {
            saw_completion = true;
        }
    }
    assert!(saw_completion);
}
