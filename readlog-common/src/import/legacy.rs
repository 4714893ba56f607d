//! Built-in legacy seed dataset
//!
//! Records predate the canonical shape: they carry `tags` instead of
//! `keywords`, `comment` instead of `review`, ratings as numbers, numeric
//! strings or placeholders, and old status labels. Everything imported from
//! here is tagged with `LEGACY_TAG`.

use serde_json::Value;

use super::{import_records, BatchAborted};
use crate::models::{ImportOutcome, LEGACY_TAG};
use crate::store::BookStore;
use crate::{Error, Result};

const LEGACY_BOOKS_JSON: &str = include_str!("../../data/legacy_books.json");

/// Parse the embedded seed dataset
pub fn legacy_books() -> Result<Vec<Value>> {
    crate::backup::parse_import_json(LEGACY_BOOKS_JSON)
}

/// Import the seed dataset into a user's collection
pub async fn import_legacy<S>(
    store: &S,
    user_id: &str,
) -> std::result::Result<ImportOutcome, BatchAborted>
where
    S: BookStore + ?Sized,
{
    let items = legacy_books().map_err(BatchAborted::before_start)?;
    if items.is_empty() {
        return Err(BatchAborted::before_start(Error::NotFound(
            "找不到內建範例資料。".to_string(),
        )));
    }
    import_records(store, user_id, &items, Some(LEGACY_TAG)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_dataset_parses_and_every_record_has_a_title() {
        let items = legacy_books().unwrap();
        assert!(!items.is_empty());
        assert!(items
            .iter()
            .all(|item| item["title"].as_str().is_some_and(|t| !t.is_empty())));
    }

    #[test]
    fn test_seed_records_normalize_and_validate() {
        for item in legacy_books().unwrap() {
            let book = crate::import::normalize(&item, None).unwrap();
            crate::validation::validate_book(&book).unwrap();
        }
    }
}
