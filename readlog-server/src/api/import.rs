//! Batch import and backup export endpoints

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Extension, Json,
};
use readlog_common::import::{self, ImportPermit};
use readlog_common::models::ImportOutcome;
use readlog_common::{backup, time};
use tracing::info;

use super::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

fn acquire(state: &AppState, user_id: &str) -> ApiResult<ImportPermit> {
    state
        .imports
        .try_acquire(user_id)
        .ok_or_else(|| ApiError::Conflict("匯入進行中，請稍候。".to_string()))
}

/// POST /api/import/json
///
/// The body is the pasted backup text, parsed in full before any write.
pub async fn import_json(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    body: String,
) -> ApiResult<Json<ImportOutcome>> {
    let _permit = acquire(&state, &user_id)?;
    let outcome = import::import_json(state.store.as_ref(), &user_id, &body).await?;
    Ok(Json(outcome))
}

/// POST /api/import/legacy
pub async fn import_legacy(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> ApiResult<Json<ImportOutcome>> {
    let _permit = acquire(&state, &user_id)?;
    let outcome = import::import_legacy(state.store.as_ref(), &user_id).await?;
    Ok(Json(outcome))
}

/// GET /api/export
///
/// Downloads the whole collection as a dated JSON attachment.
pub async fn export_backup(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> ApiResult<Response> {
    let books = state.store.list(&user_id).await?;
    let body = backup::export_json(&books)?;
    let file_name = backup::backup_file_name(time::today());

    info!(user_id = %user_id, books = books.len(), file = %file_name, "Exporting backup");

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        body,
    )
        .into_response())
}
