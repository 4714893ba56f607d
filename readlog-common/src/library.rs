//! Library operations on a user's collection
//!
//! Manual create/update/favorite paths plus the read-side views (filtering,
//! author cross-reference, stats, facets). These are pure functions; callers
//! persist the results through a `BookStore`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::{book_type, title_key, BookDraft, CanonicalBook, ReadingStatus};
use crate::uuid_utils;
use crate::validation::validate_draft;
use crate::Result;

/// Build a new record from form input
///
/// A validation failure aborts only this operation.
pub fn create_book(draft: BookDraft, now: i64) -> Result<CanonicalBook> {
    let status = validate_draft(&draft)?;
    Ok(CanonicalBook {
        id: uuid_utils::new_book_id(),
        title: draft.title,
        author: draft.author,
        status,
        rating: draft.rating,
        review: draft.review,
        quotes: draft.quotes,
        book_type: draft.book_type,
        keywords: draft.keywords,
        is_favorite: false,
        read_at: draft.read_at,
        created_at: now,
        updated_at: now,
    })
}

/// Overlay form input on an existing record
///
/// `id`, `createdAt` and `isFavorite` are kept from `existing`.
pub fn update_book(existing: &CanonicalBook, draft: BookDraft, now: i64) -> Result<CanonicalBook> {
    let status = validate_draft(&draft)?;
    Ok(CanonicalBook {
        id: existing.id.clone(),
        title: draft.title,
        author: draft.author,
        status,
        rating: draft.rating,
        review: draft.review,
        quotes: draft.quotes,
        book_type: draft.book_type,
        keywords: draft.keywords,
        is_favorite: existing.is_favorite,
        read_at: draft.read_at,
        created_at: existing.created_at,
        updated_at: now,
    })
}

pub fn toggle_favorite(existing: &CanonicalBook, now: i64) -> CanonicalBook {
    CanonicalBook {
        is_favorite: !existing.is_favorite,
        updated_at: now,
        ..existing.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
}

/// List filter; unset fields match everything
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookFilter {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub status: Option<ReadingStatus>,
    #[serde(rename = "type", default)]
    pub book_type: Option<String>,
    #[serde(default)]
    pub min_rating: Option<f64>,
    #[serde(default)]
    pub sort: SortOrder,
    #[serde(default)]
    pub only_favorites: bool,
}

impl BookFilter {
    pub fn matches(&self, book: &CanonicalBook) -> bool {
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            let hit = book.title.to_lowercase().contains(&needle)
                || book.author.to_lowercase().contains(&needle)
                || book
                    .keywords
                    .iter()
                    .any(|k| k.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        if self.status.is_some_and(|s| s != book.status) {
            return false;
        }
        if self
            .book_type
            .as_deref()
            .is_some_and(|t| t != book.book_type)
        {
            return false;
        }
        if self.min_rating.is_some_and(|min| book.rating < min) {
            return false;
        }
        !self.only_favorites || book.is_favorite
    }
}

pub fn filter_books(books: &[CanonicalBook], filter: &BookFilter) -> Vec<CanonicalBook> {
    let mut out: Vec<CanonicalBook> = books
        .iter()
        .filter(|b| filter.matches(b))
        .cloned()
        .collect();
    match filter.sort {
        SortOrder::Newest => out.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortOrder::Oldest => out.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
    }
    out
}

/// Every book by `author`, newest first
///
/// Author names compare trimmed and case-folded.
pub fn books_by_author(books: &[CanonicalBook], author: &str) -> Vec<CanonicalBook> {
    let key = title_key(author);
    let mut out: Vec<CanonicalBook> = books
        .iter()
        .filter(|b| title_key(&b.author) == key)
        .cloned()
        .collect();
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryStats {
    pub total: usize,
    pub completed: usize,
    pub to_read: usize,
}

pub fn library_stats(books: &[CanonicalBook]) -> LibraryStats {
    LibraryStats {
        total: books.len(),
        completed: books
            .iter()
            .filter(|b| b.status == ReadingStatus::Completed)
            .count(),
        to_read: books
            .iter()
            .filter(|b| b.status == ReadingStatus::ToRead)
            .count(),
    }
}

/// Distinct values used to populate pickers and autocomplete
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LibraryFacets {
    pub authors: Vec<String>,
    pub keywords: Vec<String>,
    pub types: Vec<String>,
}

pub fn library_facets(books: &[CanonicalBook]) -> LibraryFacets {
    let mut authors = BTreeSet::new();
    let mut keywords = BTreeSet::new();
    let mut types: BTreeSet<String> = book_type::BUILT_IN.iter().map(|t| t.to_string()).collect();

    for book in books {
        if !book.author.is_empty() {
            authors.insert(book.author.clone());
        }
        keywords.extend(book.keywords.iter().cloned());
        if !book.book_type.is_empty() {
            types.insert(book.book_type.clone());
        }
    }

    LibraryFacets {
        authors: authors.into_iter().collect(),
        keywords: keywords.into_iter().collect(),
        types: types.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationError;
    use crate::Error;

    fn draft(title: &str) -> BookDraft {
        BookDraft {
            title: title.to_string(),
            author: "金庸".to_string(),
            status: "閱讀中".to_string(),
            rating: 4.0,
            book_type: book_type::PHYSICAL.to_string(),
            keywords: vec!["武俠".to_string()],
            ..Default::default()
        }
    }

    fn book(id: &str, created_at: i64) -> CanonicalBook {
        let mut b = create_book(draft(id), created_at).unwrap();
        b.id = id.to_string();
        b
    }

    #[test]
    fn test_create_book_sets_identity_and_timestamps() {
        let b = create_book(draft("射鵰英雄傳"), 1_000).unwrap();
        assert!(!b.id.is_empty());
        assert_eq!(b.status, ReadingStatus::Reading);
        assert_eq!(b.created_at, 1_000);
        assert_eq!(b.updated_at, 1_000);
        assert!(!b.is_favorite);
    }

    #[test]
    fn test_create_book_rejects_invalid_draft() {
        let mut d = draft("x");
        d.rating = 5.5;
        match create_book(d, 0) {
            Err(Error::Validation(ValidationError::RatingOutOfRange)) => {}
            other => panic!("expected rating error, got {:?}", other),
        }

        let mut d = draft("x");
        d.status = "完成".to_string();
        assert!(matches!(
            create_book(d, 0),
            Err(Error::Validation(ValidationError::InvalidStatus))
        ));
    }

    #[test]
    fn test_update_keeps_id_created_and_favorite() {
        let mut existing = book("1", 100);
        existing.is_favorite = true;

        let mut d = draft("新書名");
        d.status = "完食".to_string();
        let updated = update_book(&existing, d, 200).unwrap();

        assert_eq!(updated.id, "1");
        assert_eq!(updated.title, "新書名");
        assert_eq!(updated.status, ReadingStatus::Completed);
        assert_eq!(updated.created_at, 100);
        assert_eq!(updated.updated_at, 200);
        assert!(updated.is_favorite);
    }

    #[test]
    fn test_toggle_favorite() {
        let b = book("1", 100);
        let on = toggle_favorite(&b, 150);
        assert!(on.is_favorite);
        assert_eq!(on.updated_at, 150);
        assert!(!toggle_favorite(&on, 160).is_favorite);
    }

    #[test]
    fn test_filter_search_matches_title_author_and_keywords() {
        let mut a = book("a", 1);
        a.title = "Dune".to_string();
        let mut b = book("b", 2);
        b.author = "Frank HERBERT".to_string();
        let mut c = book("c", 3);
        c.keywords = vec!["Sci-Fi".to_string()];
        let books = vec![a, b, c];

        let by = |s: &str| {
            filter_books(
                &books,
                &BookFilter {
                    search: Some(s.to_string()),
                    ..Default::default()
                },
            )
            .into_iter()
            .map(|b| b.id)
            .collect::<Vec<_>>()
        };
        assert_eq!(by("dune"), vec!["a"]);
        assert_eq!(by("herbert"), vec!["b"]);
        assert_eq!(by("sci"), vec!["c"]);
        assert_eq!(by("").len(), 3);
    }

    #[test]
    fn test_filter_status_type_rating_favorite_and_sort() {
        let mut a = book("a", 1);
        a.rating = 2.0;
        let mut b = book("b", 2);
        b.status = ReadingStatus::Completed;
        b.is_favorite = true;
        let mut c = book("c", 3);
        c.book_type = book_type::COMIC.to_string();
        let books = vec![a, b, c];

        let ids = |f: BookFilter| {
            filter_books(&books, &f)
                .into_iter()
                .map(|b| b.id)
                .collect::<Vec<_>>()
        };

        assert_eq!(ids(BookFilter::default()), vec!["c", "b", "a"]);
        assert_eq!(
            ids(BookFilter {
                sort: SortOrder::Oldest,
                ..Default::default()
            }),
            vec!["a", "b", "c"]
        );
        assert_eq!(
            ids(BookFilter {
                status: Some(ReadingStatus::Completed),
                ..Default::default()
            }),
            vec!["b"]
        );
        assert_eq!(
            ids(BookFilter {
                book_type: Some(book_type::COMIC.to_string()),
                ..Default::default()
            }),
            vec!["c"]
        );
        assert_eq!(
            ids(BookFilter {
                min_rating: Some(3.0),
                ..Default::default()
            }),
            vec!["c", "b"]
        );
        assert_eq!(
            ids(BookFilter {
                only_favorites: true,
                ..Default::default()
            }),
            vec!["b"]
        );
    }

    #[test]
    fn test_filter_deserializes_from_query_shape() {
        let f: BookFilter = serde_json::from_value(serde_json::json!({
            "status": "待閱",
            "type": "漫畫",
            "minRating": 3,
            "sort": "oldest",
            "onlyFavorites": true
        }))
        .unwrap();
        assert_eq!(f.status, Some(ReadingStatus::ToRead));
        assert_eq!(f.book_type.as_deref(), Some("漫畫"));
        assert_eq!(f.min_rating, Some(3.0));
        assert_eq!(f.sort, SortOrder::Oldest);
        assert!(f.only_favorites);
    }

    #[test]
    fn test_books_by_author_folds_case_and_whitespace() {
        let mut a = book("a", 1);
        a.author = "Ursula K. Le Guin".to_string();
        let mut b = book("b", 5);
        b.author = " ursula k. le guin ".to_string();
        let c = book("c", 9);

        let ids: Vec<_> = books_by_author(&[a, b, c], "URSULA K. LE GUIN")
            .into_iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_library_stats() {
        let mut a = book("a", 1);
        a.status = ReadingStatus::Completed;
        let mut b = book("b", 2);
        b.status = ReadingStatus::ToRead;
        let c = book("c", 3);

        assert_eq!(
            library_stats(&[a, b, c]),
            LibraryStats {
                total: 3,
                completed: 1,
                to_read: 1
            }
        );
        assert_eq!(library_stats(&[]), LibraryStats::default());
    }

    #[test]
    fn test_library_facets_sorted_distinct_with_builtin_types() {
        let mut a = book("a", 1);
        a.author = "B".to_string();
        a.keywords = vec!["z".to_string(), "y".to_string()];
        a.book_type = "雜誌".to_string();
        let mut b = book("b", 2);
        b.author = "A".to_string();
        b.keywords = vec!["y".to_string()];

        let facets = library_facets(&[a, b]);
        assert_eq!(facets.authors, vec!["A", "B"]);
        assert_eq!(facets.keywords, vec!["y", "z"]);
        assert!(facets.types.contains(&"雜誌".to_string()));
        for t in book_type::BUILT_IN {
            assert!(facets.types.contains(&t.to_string()));
        }
        assert_eq!(facets.types.len(), book_type::BUILT_IN.len() + 1);
    }
}
