//! Server-Sent Events for live collection updates

use axum::{
    extract::State,
    response::sse::{Event, Sse},
    Extension,
};
use futures::stream::Stream;
use std::convert::Infallible;

use super::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

/// GET /api/events
///
/// Streams `CollectionChanged` events carrying the user's full collection,
/// starting with the current one.
pub async fn event_stream(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let subscription = state.store.subscribe(&user_id).await?;
    Ok(readlog_common::sse::create_collection_sse_stream(subscription))
}
