//! Server-Sent Events (SSE) utilities

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::events::{CollectionSubscription, CollectionUpdate};

/// Interval between heartbeat comments on idle streams
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// SSE event name carrying a full collection snapshot
pub const COLLECTION_EVENT: &str = "CollectionChanged";

/// SSE event name carrying `{insertedCount, updatedCount}` of a finished import
pub const IMPORT_EVENT: &str = "ImportCompleted";

/// Stream a user's collection snapshots as SSE
///
/// Sends `ConnectionStatus: connected`, then the initial collection, then a
/// `CollectionChanged` event per write and an `ImportCompleted` event per
/// finished import. The stream ends when the store's
/// event bus goes away; a heartbeat keeps idle connections open.
pub fn create_collection_sse_stream(
    mut subscription: CollectionSubscription,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(user_id = %subscription.user_id(), "New SSE client connected to collection events");

    let stream = async_stream::stream! {
        yield Ok(Event::default()
            .event("ConnectionStatus")
            .data("connected"));

        while let Some(update) = subscription.next_update().await {
            let encoded = match &update {
                CollectionUpdate::Snapshot(books) => {
                    debug!(user_id = %subscription.user_id(), count = books.len(), "SSE: sending snapshot");
                    Event::default().event(COLLECTION_EVENT).json_data(books)
                }
                CollectionUpdate::ImportCompleted(outcome) => {
                    debug!(user_id = %subscription.user_id(), "SSE: sending import completion");
                    Event::default().event(IMPORT_EVENT).json_data(outcome)
                }
            };
            match encoded {
                Ok(event) => yield Ok(event),
                Err(e) => warn!("SSE: failed to encode update: {}", e),
            }
        }

        debug!(user_id = %subscription.user_id(), "SSE: collection stream ended");
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(HEARTBEAT_INTERVAL)
            .text("heartbeat"),
    )
}
