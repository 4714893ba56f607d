//! AI metadata suggestion endpoint

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::services::AiSuggestion;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SuggestRequest {
    pub title: String,
    #[serde(default)]
    pub author: String,
}

/// POST /api/suggest
///
/// 503 when no API key is configured; upstream failures return the
/// fallback suggestion with 200.
pub async fn suggest_metadata(
    State(state): State<AppState>,
    Json(request): Json<SuggestRequest>,
) -> ApiResult<Json<AiSuggestion>> {
    let suggester = state
        .suggester
        .as_ref()
        .ok_or_else(|| ApiError::ServiceUnavailable("AI suggestions are not configured".to_string()))?;

    if request.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title is required".to_string()));
    }

    Ok(Json(suggester.suggest(&request.title, &request.author).await))
}
