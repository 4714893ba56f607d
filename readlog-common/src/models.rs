//! Book models
//!
//! `CanonicalBook` is the normalized shape every store, import and API path
//! operates on. Field names serialize in camelCase so backups stay
//! interchangeable with the web client's export format.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Built-in book type labels and other fixed strings
pub mod book_type {
    pub const COMIC: &str = "漫畫";
    pub const PHYSICAL: &str = "實體書";
    pub const ORIGINAL_NOVEL: &str = "原創小說";
    pub const FOREIGN: &str = "外文書";
    pub const NON_FICTION: &str = "非小說";

    /// Types always offered to the UI, whether or not any book uses them
    pub const BUILT_IN: [&str; 5] = [COMIC, PHYSICAL, ORIGINAL_NOVEL, FOREIGN, NON_FICTION];

    /// Applied when an imported record has no type
    pub const DEFAULT_BOOK_TYPE: &str = ORIGINAL_NOVEL;
}

/// Placeholder author for records that never named one
pub const UNKNOWN_AUTHOR: &str = "未知";

/// Keyword appended to every record brought in by the legacy seed import
pub const LEGACY_TAG: &str = "舊紀錄";

/// Reading status
///
/// Serialized as the canonical labels used by stored documents and backups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReadingStatus {
    #[serde(rename = "完食")]
    Completed,
    #[serde(rename = "待閱")]
    ToRead,
    #[serde(rename = "棄書")]
    Dropped,
    #[serde(rename = "閱讀中")]
    Reading,
}

impl ReadingStatus {
    pub const ALL: [ReadingStatus; 4] = [
        ReadingStatus::Completed,
        ReadingStatus::ToRead,
        ReadingStatus::Dropped,
        ReadingStatus::Reading,
    ];

    /// Canonical label as stored
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingStatus::Completed => "完食",
            ReadingStatus::ToRead => "待閱",
            ReadingStatus::Dropped => "棄書",
            ReadingStatus::Reading => "閱讀中",
        }
    }

    /// Parse a canonical label. Legacy spellings are not accepted here;
    /// see `import::status_from_raw` for the import-side mapping.
    pub fn from_canonical(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }
}

impl Default for ReadingStatus {
    fn default() -> Self {
        ReadingStatus::Completed
    }
}

impl fmt::Display for ReadingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized book record
///
/// Records are replaced wholesale on every write; there is no partial update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalBook {
    pub id: String,
    pub title: String,
    pub author: String,
    pub status: ReadingStatus,
    /// 0 to 5 once validated
    pub rating: f64,
    #[serde(default)]
    pub review: String,
    #[serde(default)]
    pub quotes: Vec<String>,
    #[serde(rename = "type")]
    pub book_type: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl CanonicalBook {
    /// Title key used to match incoming records against existing ones
    pub fn match_key(&self) -> String {
        title_key(&self.title)
    }
}

/// Trim and case-fold a title for duplicate detection
pub fn title_key(title: &str) -> String {
    title.trim().to_lowercase()
}

/// User-editable fields submitted by the add / edit form
///
/// `status` stays a string so that an unknown label surfaces as a
/// validation error instead of a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDraft {
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub review: String,
    #[serde(default)]
    pub quotes: Vec<String>,
    #[serde(rename = "type", default)]
    pub book_type: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub read_at: Option<i64>,
}

/// Import run counters, reset per invocation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub inserted_count: usize,
    pub updated_count: usize,
}
