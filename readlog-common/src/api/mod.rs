//! Shared HTTP API functionality
//!
//! Framework-independent pieces only: signature checks and the settings
//! access behind them. The server wraps these in axum middleware.

pub mod auth;

pub use auth::{
    calculate_signature, initialize_shared_secret, load_shared_secret, validate_signature,
    validate_timestamp, ApiAuthError, DEMO_USER_ID, SIGNATURE_HEADER, TIMESTAMP_HEADER,
    USER_HEADER,
};
