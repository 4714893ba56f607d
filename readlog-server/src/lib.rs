//! readlog-server library
//!
//! HTTP service over a per-user reading log: CRUD, filtered views, batch
//! import, backup export, live collection events and AI metadata hints.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use readlog_common::import::ImportGuard;
use readlog_common::store::BookStore;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;
pub mod services;

use services::MetadataSuggester;

/// Request body cap for `/api/import/json`; a full export must fit
pub const MAX_IMPORT_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Book persistence
    pub store: Arc<dyn BookStore>,
    /// One import at a time per user
    pub imports: ImportGuard,
    /// Shared secret for request signatures; 0 disables checking
    pub shared_secret: i64,
    /// Absent when no Gemini API key is configured
    pub suggester: Option<Arc<dyn MetadataSuggester>>,
}

impl AppState {
    pub fn new(store: Arc<dyn BookStore>, shared_secret: i64) -> Self {
        Self {
            store,
            imports: ImportGuard::new(),
            shared_secret,
            suggester: None,
        }
    }

    pub fn with_suggester(mut self, suggester: Arc<dyn MetadataSuggester>) -> Self {
        self.suggester = Some(suggester);
        self
    }
}

/// Build application router
///
/// `/health` is public; everything under `/api` goes through the auth
/// middleware, which resolves the calling user.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post};

    let protected = Router::new()
        .route("/api/books", get(api::list_books).post(api::create_book))
        .route(
            "/api/books/:id",
            get(api::get_book).put(api::update_book).delete(api::delete_book),
        )
        .route("/api/books/:id/favorite", post(api::toggle_favorite))
        .route("/api/authors/:author/books", get(api::author_books))
        .route("/api/stats", get(api::stats))
        .route("/api/facets", get(api::facets))
        .route(
            "/api/import/json",
            post(api::import_json).layer(DefaultBodyLimit::max(MAX_IMPORT_BODY_BYTES)),
        )
        .route("/api/import/legacy", post(api::import_legacy))
        .route("/api/export", get(api::export_backup))
        .route("/api/events", get(api::event_stream))
        .route("/api/suggest", post(api::suggest_metadata))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    Router::new()
        .merge(protected)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
