//! Request signing
//!
//! A caller identifies as a user with three headers: the user id, a
//! millisecond timestamp and `sha256("{user}:{timestamp}:{secret}")` in hex.
//! The secret is an i64 kept in the `settings` table; `0` disables checking.

use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;

use crate::db::{get_setting, set_setting};

pub const USER_HEADER: &str = "x-readlog-user";
pub const TIMESTAMP_HEADER: &str = "x-readlog-timestamp";
pub const SIGNATURE_HEADER: &str = "x-readlog-signature";

/// User assumed when auth is disabled and no user header is sent
pub const DEMO_USER_ID: &str = "demo-wizard-001";

const SHARED_SECRET_KEY: &str = "api_shared_secret";

/// Accepted clock skew, milliseconds
const MAX_PAST_MS: i64 = 60_000;
const MAX_FUTURE_MS: i64 = 1_000;

#[derive(Debug, Clone, Error)]
pub enum ApiAuthError {
    #[error("Invalid timestamp: {reason}")]
    InvalidTimestamp {
        timestamp: i64,
        now: i64,
        reason: String,
    },

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Missing header: {0}")]
    MissingHeader(&'static str),

    #[error("Malformed header {header}: {reason}")]
    MalformedHeader {
        header: &'static str,
        reason: String,
    },

    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Load the shared secret, creating one on first use
pub async fn load_shared_secret(db: &SqlitePool) -> Result<i64, ApiAuthError> {
    let value = get_setting(db, SHARED_SECRET_KEY)
        .await
        .map_err(|e| ApiAuthError::DatabaseError(e.to_string()))?;

    match value {
        Some(value) => value
            .parse::<i64>()
            .map_err(|e| ApiAuthError::DatabaseError(format!("Invalid i64: {}", e))),
        None => initialize_shared_secret(db).await,
    }
}

/// Generate and store a fresh non-zero secret
pub async fn initialize_shared_secret(db: &SqlitePool) -> Result<i64, ApiAuthError> {
    use rand::Rng;

    let mut rng = rand::thread_rng();
    let secret: i64 = loop {
        let val = rng.gen::<i64>();
        if val != 0 {
            break val;
        }
    };

    set_setting(db, SHARED_SECRET_KEY, &secret.to_string())
        .await
        .map_err(|e| ApiAuthError::DatabaseError(e.to_string()))?;
    info!("Generated new API shared secret");

    Ok(secret)
}

pub fn calculate_signature(user_id: &str, timestamp: i64, shared_secret: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}:{}:{}", user_id, timestamp, shared_secret).as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn validate_signature(
    provided: &str,
    user_id: &str,
    timestamp: i64,
    shared_secret: i64,
) -> Result<(), ApiAuthError> {
    let calculated = calculate_signature(user_id, timestamp, shared_secret);
    if !provided.eq_ignore_ascii_case(&calculated) {
        return Err(ApiAuthError::InvalidSignature);
    }
    Ok(())
}

/// Check `timestamp` against the current clock
pub fn validate_timestamp(timestamp: i64) -> Result<(), ApiAuthError> {
    validate_timestamp_at(timestamp, crate::time::now_ms())
}

/// Check `timestamp` against `now`: at most 60 s old, at most 1 s ahead
pub fn validate_timestamp_at(timestamp: i64, now: i64) -> Result<(), ApiAuthError> {
    let diff = now - timestamp;

    if diff > MAX_PAST_MS {
        return Err(ApiAuthError::InvalidTimestamp {
            timestamp,
            now,
            reason: format!("Timestamp {}ms too old (max {}ms past)", diff, MAX_PAST_MS),
        });
    }

    if diff < -MAX_FUTURE_MS {
        return Err(ApiAuthError::InvalidTimestamp {
            timestamp,
            now,
            reason: format!(
                "Timestamp {}ms in future (max {}ms future)",
                diff.abs(),
                MAX_FUTURE_MS
            ),
        });
    }

    Ok(())
}
