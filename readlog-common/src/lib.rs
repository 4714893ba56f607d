//! # Readlog Common Library
//!
//! Shared code for the reading-log service including:
//! - Canonical book model and library operations (filter, stats, authors)
//! - Import reconciliation for legacy and pasted JSON records
//! - Field validation
//! - Backup export / import codec
//! - Persistence trait with in-memory and SQLite stores
//! - Per-store event bus and collection subscriptions
//! - Configuration loading

pub mod api;
pub mod backup;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod import;
pub mod library;
pub mod models;
pub mod sse;
pub mod store;
pub mod time;
pub mod uuid_utils;
pub mod validation;

pub use error::{Error, Result};
pub use models::{BookDraft, CanonicalBook, ReadingStatus};
pub use validation::ValidationError;
