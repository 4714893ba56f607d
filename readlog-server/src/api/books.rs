//! Book collection endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use readlog_common::library::{self, BookFilter, LibraryFacets, LibraryStats};
use readlog_common::{time, BookDraft, CanonicalBook};
use tracing::info;

use super::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

async fn load_book(state: &AppState, user_id: &str, id: &str) -> ApiResult<CanonicalBook> {
    state
        .store
        .get(user_id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("book {}", id)))
}

/// GET /api/books
pub async fn list_books(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Query(filter): Query<BookFilter>,
) -> ApiResult<Json<Vec<CanonicalBook>>> {
    let books = state.store.list(&user_id).await?;
    Ok(Json(library::filter_books(&books, &filter)))
}

/// POST /api/books
pub async fn create_book(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(draft): Json<BookDraft>,
) -> ApiResult<(StatusCode, Json<CanonicalBook>)> {
    let book = library::create_book(draft, time::now_ms())?;
    state.store.save(&user_id, &book).await?;
    info!(user_id = %user_id, book_id = %book.id, "Book created");
    Ok((StatusCode::CREATED, Json(book)))
}

/// GET /api/books/:id
pub async fn get_book(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<CanonicalBook>> {
    Ok(Json(load_book(&state, &user_id, &id).await?))
}

/// PUT /api/books/:id
pub async fn update_book(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(draft): Json<BookDraft>,
) -> ApiResult<Json<CanonicalBook>> {
    let existing = load_book(&state, &user_id, &id).await?;
    let book = library::update_book(&existing, draft, time::now_ms())?;
    state.store.save(&user_id, &book).await?;
    info!(user_id = %user_id, book_id = %book.id, "Book updated");
    Ok(Json(book))
}

/// DELETE /api/books/:id
pub async fn delete_book(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.store.delete(&user_id, &id).await?;
    info!(user_id = %user_id, book_id = %id, "Book deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/books/:id/favorite
pub async fn toggle_favorite(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<CanonicalBook>> {
    let existing = load_book(&state, &user_id, &id).await?;
    let book = library::toggle_favorite(&existing, time::now_ms());
    state.store.save(&user_id, &book).await?;
    Ok(Json(book))
}

/// GET /api/authors/:author/books
pub async fn author_books(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(author): Path<String>,
) -> ApiResult<Json<Vec<CanonicalBook>>> {
    let books = state.store.list(&user_id).await?;
    Ok(Json(library::books_by_author(&books, &author)))
}

/// GET /api/stats
pub async fn stats(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> ApiResult<Json<LibraryStats>> {
    let books = state.store.list(&user_id).await?;
    Ok(Json(library::library_stats(&books)))
}

/// GET /api/facets
pub async fn facets(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> ApiResult<Json<LibraryFacets>> {
    let books = state.store.list(&user_id).await?;
    Ok(Json(library::library_facets(&books)))
}
