//! Timestamp utilities
//!
//! Book records carry Unix epoch milliseconds, matching the backup format.

use chrono::{NaiveDate, Utc};

/// Current time as Unix epoch milliseconds
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Today's calendar date (UTC), used to name backup files
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}
