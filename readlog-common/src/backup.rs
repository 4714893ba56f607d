//! JSON backup export and import parsing
//!
//! Export is a straight serialization of the canonical collection; import
//! accepts any JSON array and leaves per-record interpretation to the
//! reconciler.

use chrono::NaiveDate;
use serde_json::Value;

use crate::models::CanonicalBook;
use crate::{Error, Result};

const NOT_AN_ARRAY: &str = "匯入格式錯誤：必須是書籍陣列 ([...])";

/// Serialize the collection as indented JSON
pub fn export_json(books: &[CanonicalBook]) -> Result<String> {
    Ok(serde_json::to_string_pretty(books)?)
}

/// Download file name for a backup taken on `date`
pub fn backup_file_name(date: NaiveDate) -> String {
    format!("reading_tracker_backup_{}.json", date.format("%Y-%m-%d"))
}

/// Parse pasted backup text into raw records
///
/// Fails with `Error::Parse` when the text is not JSON or the top level is
/// not an array.
pub fn parse_import_json(text: &str) -> Result<Vec<Value>> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| Error::Parse(format!("invalid JSON: {}", e)))?;
    match value {
        Value::Array(items) => Ok(items),
        _ => Err(Error::Parse(NOT_AN_ARRAY.to_string())),
    }
}
