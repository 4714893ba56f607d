//! Authentication middleware
//!
//! Resolves the calling user from the `X-Readlog-*` headers and stores it
//! as an `AuthUser` request extension for the handlers.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use readlog_common::api::auth::{
    validate_signature, validate_timestamp, ApiAuthError, DEMO_USER_ID, SIGNATURE_HEADER,
    TIMESTAMP_HEADER, USER_HEADER,
};
use serde_json::json;
use tracing::warn;

use crate::AppState;

/// The user a request acts for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser(pub String);

/// Authentication middleware
///
/// With the shared secret set to 0 the user header is trusted as-is and
/// defaults to the demo user. Otherwise all three headers are required and
/// the signature must match.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user_id = resolve_user(request.headers(), state.shared_secret)?;
    request.extensions_mut().insert(AuthUser(user_id));
    Ok(next.run(request).await)
}

fn header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<Option<&'a str>, AuthError> {
    match headers.get(name) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(|v| Some(v.trim()))
            .map_err(|_| AuthError::from(ApiAuthError::MalformedHeader {
                header: name,
                reason: "not visible ASCII".to_string(),
            })),
    }
}

fn resolve_user(headers: &HeaderMap, shared_secret: i64) -> Result<String, AuthError> {
    let user = header(headers, USER_HEADER)?.filter(|u| !u.is_empty());

    if shared_secret == 0 {
        return Ok(user.unwrap_or(DEMO_USER_ID).to_string());
    }

    let user = user.ok_or(ApiAuthError::MissingHeader(USER_HEADER))?;
    let timestamp = header(headers, TIMESTAMP_HEADER)?
        .ok_or(ApiAuthError::MissingHeader(TIMESTAMP_HEADER))?;
    let signature = header(headers, SIGNATURE_HEADER)?
        .ok_or(ApiAuthError::MissingHeader(SIGNATURE_HEADER))?;

    let timestamp: i64 = timestamp
        .parse()
        .map_err(|e: std::num::ParseIntError| ApiAuthError::MalformedHeader {
            header: TIMESTAMP_HEADER,
            reason: e.to_string(),
        })?;

    validate_timestamp(timestamp)?;
    validate_signature(signature, user, timestamp, shared_secret).map_err(|e| {
        warn!(user_id = %user, "Signature validation failed");
        e
    })?;

    Ok(user.to_string())
}

/// Authentication error for HTTP responses
#[derive(Debug)]
pub struct AuthError(ApiAuthError);

impl From<ApiAuthError> for AuthError {
    fn from(err: ApiAuthError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = match self.0 {
            ApiAuthError::InvalidTimestamp { .. } | ApiAuthError::InvalidSignature => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED")
            }
            ApiAuthError::MissingHeader(_) | ApiAuthError::MalformedHeader { .. } => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST")
            }
            ApiAuthError::DatabaseError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.0.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
