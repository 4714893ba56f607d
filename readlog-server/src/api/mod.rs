//! HTTP API handlers for readlog-server

pub mod auth;
pub mod books;
pub mod health;
pub mod import;
pub mod sse;
pub mod suggest;

pub use auth::{auth_middleware, AuthUser};
pub use books::{
    author_books, create_book, delete_book, facets, get_book, list_books, stats, toggle_favorite,
    update_book,
};
pub use health::health_routes;
pub use import::{export_backup, import_json, import_legacy};
pub use sse::event_stream;
pub use suggest::suggest_metadata;
