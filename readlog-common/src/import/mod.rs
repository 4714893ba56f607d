//! Import reconciliation
//!
//! Turns loosely-typed book records (legacy seed data, pasted backups) into
//! `CanonicalBook` values and merges them into an existing collection:
//!
//! - a record without a title is skipped and counted nowhere
//! - each record is matched against the collection snapshot taken before the
//!   batch started, by trimmed, case-folded title; records earlier in the
//!   same batch are never seen by later ones
//! - a match reuses the existing id, `createdAt` and favorite flag
//! - every record is validated, then persisted, one at a time; the next
//!   record is not touched until the previous write has completed
//! - a validation or store failure aborts the rest of the batch without
//!   rolling back records already written

pub mod guard;
pub mod legacy;

pub use guard::{ImportGuard, ImportPermit};
pub use legacy::{import_legacy, legacy_books};

use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use tracing::{debug, info, warn};

use crate::events::LibraryEvent;
use crate::models::{
    book_type, title_key, CanonicalBook, ImportOutcome, ReadingStatus, UNKNOWN_AUTHOR,
};
use crate::store::BookStore;
use crate::validation::validate_book;
use crate::{time, uuid_utils, Error, Result};

/// Rating strings that mean "not rated"
const NO_RATING_SENTINELS: [&str; 2] = ["N/A", "X"];

/// Review text that means "no review"
const NO_REVIEW_SENTINEL: &str = "N/A";

/// Status labels from before the fixed enumeration existed
///
/// Any label that is neither canonical nor listed here maps to
/// `ReadingStatus::Completed`: the legacy dataset was a finished-reading list.
const LEGACY_STATUS_ALIASES: [(&str, ReadingStatus); 3] = [
    ("待看", ReadingStatus::ToRead),
    ("棄書", ReadingStatus::Dropped),
    ("閱讀中", ReadingStatus::Reading),
];

/// A batch import that stopped part-way
///
/// Records counted in `completed` were already persisted and stay persisted.
#[derive(Debug)]
pub struct BatchAborted {
    pub completed: ImportOutcome,
    pub cause: Error,
}

impl BatchAborted {
    /// Failure raised before any record was processed
    pub fn before_start(cause: Error) -> Self {
        Self {
            completed: ImportOutcome::default(),
            cause,
        }
    }
}

impl fmt::Display for BatchAborted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "import aborted after {} inserted and {} updated: {}",
            self.completed.inserted_count, self.completed.updated_count, self.cause
        )
    }
}

impl std::error::Error for BatchAborted {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

/// Normalize a raw record, stamping `updatedAt` with the current time
///
/// Fails with `Error::InvalidRecord` when the record has no usable title.
pub fn normalize(raw: &Value, existing: Option<&CanonicalBook>) -> Result<CanonicalBook> {
    normalize_at(raw, existing, time::now_ms())
}

/// Normalize a raw record against an optional existing match
///
/// `now` is used for `updatedAt`, and for `createdAt` of new records that
/// do not carry one.
pub fn normalize_at(
    raw: &Value,
    existing: Option<&CanonicalBook>,
    now: i64,
) -> Result<CanonicalBook> {
    let title = raw_title(raw)
        .ok_or_else(|| Error::InvalidRecord("record has no title".to_string()))?;

    let (id, created_at) = match existing {
        Some(book) => (book.id.clone(), book.created_at),
        None => (
            uuid_utils::new_book_id(),
            timestamp_field(raw, "createdAt").unwrap_or(now),
        ),
    };

    let author = truthy_str(raw, "author")
        .map(str::to_string)
        .or_else(|| existing.map(|b| b.author.clone()).filter(|a| !a.is_empty()))
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());

    let is_favorite = match existing {
        Some(book) => book.is_favorite,
        None => raw.get("isFavorite").map(is_truthy).unwrap_or(false),
    };

    let read_at = timestamp_field(raw, "readAt").or_else(|| existing.and_then(|b| b.read_at));

    Ok(CanonicalBook {
        id,
        title: title.to_string(),
        author,
        status: status_from_raw(raw.get("status")),
        rating: parse_rating(raw.get("rating")),
        review: review_from_raw(raw),
        quotes: string_list(raw.get("quotes")).unwrap_or_default(),
        book_type: truthy_str(raw, "type")
            .unwrap_or(book_type::DEFAULT_BOOK_TYPE)
            .to_string(),
        keywords: keywords_from_raw(raw),
        is_favorite,
        read_at,
        created_at,
        updated_at: now,
    })
}

/// Reconcile a batch of raw records against an existing collection
///
/// `existing` is the snapshot taken before the batch; it is not updated as
/// records are written. `persist` is awaited for every record before the
/// next one is examined. When `tag_append` is given it is added to each
/// record's keywords unless already present.
pub async fn reconcile_batch<F, Fut>(
    raw_items: &[Value],
    existing: &[CanonicalBook],
    mut persist: F,
    tag_append: Option<&str>,
) -> std::result::Result<ImportOutcome, BatchAborted>
where
    F: FnMut(CanonicalBook) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut outcome = ImportOutcome::default();

    for (index, raw) in raw_items.iter().enumerate() {
        let Some(title) = raw_title(raw) else {
            debug!(index, "Skipping import record without title");
            continue;
        };

        let key = title_key(title);
        let existing_match = existing.iter().find(|b| b.match_key() == key);

        let mut book = match normalize(raw, existing_match) {
            Ok(book) => book,
            Err(Error::InvalidRecord(reason)) => {
                debug!(index, %reason, "Skipping invalid import record");
                continue;
            }
            Err(cause) => return Err(BatchAborted { completed: outcome, cause }),
        };

        if let Some(tag) = tag_append {
            if !book.keywords.iter().any(|k| k == tag) {
                book.keywords.push(tag.to_string());
            }
        }

        if let Err(e) = validate_book(&book) {
            warn!(index, title = %book.title, error = %e, "Import record failed validation; aborting batch");
            return Err(BatchAborted {
                completed: outcome,
                cause: Error::Validation(e),
            });
        }

        if let Err(cause) = persist(book).await {
            warn!(index, error = %cause, "Persisting import record failed; aborting batch");
            return Err(BatchAborted { completed: outcome, cause });
        }

        if existing_match.is_some() {
            outcome.updated_count += 1;
        } else {
            outcome.inserted_count += 1;
        }
    }

    Ok(outcome)
}

/// Import raw records into a user's collection held by `store`
///
/// Takes the collection snapshot, runs `reconcile_batch` with the store as
/// the persist collaborator and announces the result on the store's event bus.
pub async fn import_records<S>(
    store: &S,
    user_id: &str,
    raw_items: &[Value],
    tag_append: Option<&str>,
) -> std::result::Result<ImportOutcome, BatchAborted>
where
    S: BookStore + ?Sized,
{
    let existing = store.list(user_id).await.map_err(BatchAborted::before_start)?;

    info!(
        user_id = %user_id,
        records = raw_items.len(),
        existing = existing.len(),
        "Starting import"
    );

    let outcome = reconcile_batch(
        raw_items,
        &existing,
        |book| async move { store.save(user_id, &book).await },
        tag_append,
    )
    .await?;

    info!(
        user_id = %user_id,
        inserted = outcome.inserted_count,
        updated = outcome.updated_count,
        "Import completed"
    );

    store
        .events()
        .emit_lossy(LibraryEvent::import_completed(user_id, outcome));

    Ok(outcome)
}

/// Import a pasted JSON backup into a user's collection
///
/// The text is fully parsed before any record is written.
pub async fn import_json<S>(
    store: &S,
    user_id: &str,
    json_text: &str,
) -> std::result::Result<ImportOutcome, BatchAborted>
where
    S: BookStore + ?Sized,
{
    let items = crate::backup::parse_import_json(json_text).map_err(BatchAborted::before_start)?;
    import_records(store, user_id, &items, None).await
}

/// Map a raw status value to the enumeration
pub fn status_from_raw(value: Option<&Value>) -> ReadingStatus {
    let Some(label) = value.and_then(Value::as_str) else {
        return ReadingStatus::default();
    };
    ReadingStatus::from_canonical(label)
        .or_else(|| {
            LEGACY_STATUS_ALIASES
                .iter()
                .find(|(alias, _)| *alias == label)
                .map(|(_, status)| *status)
        })
        .unwrap_or_default()
}

/// Parse a raw rating
///
/// Numbers pass through unclamped; range checks belong to validation.
/// Strings are parsed as a leading decimal number; the no-rating sentinels
/// and unparseable text yield 0, as does any other JSON type.
pub fn parse_rating(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) if NO_RATING_SENTINELS.contains(&s.as_str()) => 0.0,
        Some(Value::String(s)) => parse_leading_float(s)
            .filter(|r| !r.is_nan())
            .unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Parse the longest decimal prefix of `s`, after leading whitespace
///
/// "4.5" -> 4.5, "3 stars" -> 3, ".5" -> 0.5, "1e2x" -> 100, "abc" -> None.
fn parse_leading_float(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }

    let rest = &s[end..];
    if rest.starts_with("Infinity") {
        let infinite = f64::INFINITY;
        return Some(if s.starts_with('-') { -infinite } else { infinite });
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }

    // Exponent only counts when at least one digit follows it
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    let literal = &s[..end];
    let literal = literal.strip_suffix('.').unwrap_or(literal);
    let normalized = match literal.find('.') {
        Some(0) => format!("0{literal}"),
        _ => literal.replacen("-.", "-0.", 1).replacen("+.", "+0.", 1),
    };
    normalized.parse::<f64>().ok()
}

fn review_from_raw(raw: &Value) -> String {
    let review = truthy_str(raw, "review")
        .or_else(|| truthy_str(raw, "comment"))
        .unwrap_or_default();
    if review == NO_REVIEW_SENTINEL {
        String::new()
    } else {
        review.to_string()
    }
}

/// `keywords` when it is a list, else `tags` when that is a list, deduplicated
fn keywords_from_raw(raw: &Value) -> Vec<String> {
    let chosen = string_list(raw.get("keywords"))
        .or_else(|| string_list(raw.get("tags")))
        .unwrap_or_default();

    let mut seen = HashSet::new();
    chosen
        .into_iter()
        .filter(|k| seen.insert(k.clone()))
        .collect()
}

/// Non-empty string title, if any
fn raw_title(raw: &Value) -> Option<&str> {
    truthy_str(raw, "title")
}

fn truthy_str<'a>(raw: &'a Value, field: &str) -> Option<&'a str> {
    raw.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// String entries of a JSON array; `None` when the value is not an array
fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    value.and_then(Value::as_array).map(|items| {
        items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect()
    })
}

/// Non-zero numeric epoch-millisecond field
fn timestamp_field(raw: &Value, field: &str) -> Option<i64> {
    let Value::Number(n) = raw.get(field)? else {
        return None;
    };
    let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
    (millis != 0).then_some(millis)
}

/// JavaScript-style truthiness of a JSON value
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
