//! Book field validation
//!
//! Every record passes through `validate_book` before it is persisted, on
//! the manual add/edit paths and inside batch imports alike. The first
//! failing rule is reported; messages are user-facing (zh-TW).

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::models::{BookDraft, CanonicalBook, ReadingStatus};

pub const MAX_TITLE_LENGTH: usize = 100;
pub const MAX_AUTHOR_LENGTH: usize = 50;
pub const MAX_TYPE_LENGTH: usize = 30;
pub const MAX_REVIEW_LENGTH: usize = 2000;
pub const MAX_KEYWORDS_COUNT: usize = 10;
pub const MAX_KEYWORD_LENGTH: usize = 20;
pub const MAX_RATING: f64 = 5.0;

static SCRIPT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<script\b[^>]*>[\s\S]*?</script>").expect("script pattern is a valid regex")
});

/// A field-shape or constraint violation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("書籍標題為必填項目且必須是文字。")]
    MissingTitle,

    #[error("書籍標題過長 (最大 100 字)。")]
    TitleTooLong,

    #[error("作者名稱過長 (最大 50 字)。")]
    AuthorTooLong,

    #[error("心得內容過長 (最大 2000 字)。")]
    ReviewTooLong,

    #[error("無效的閱讀狀態。")]
    InvalidStatus,

    #[error("書籍類型為必填項目。")]
    MissingType,

    #[error("書籍類型名稱過長 (最大 30 字)。")]
    TypeTooLong,

    #[error("評分必須介於 0 到 5 之間。")]
    RatingOutOfRange,

    #[error("關鍵字數量過多 (最多 10 個)。")]
    TooManyKeywords,

    #[error("關鍵字 \"{0}\" 無效或過長。")]
    InvalidKeyword(String),

    #[error("偵測到潛在的惡意程式碼輸入。")]
    ScriptInjection,
}

/// Borrowed view over the fields shared by drafts and canonical records
struct Fields<'a> {
    title: &'a str,
    author: &'a str,
    status: Option<ReadingStatus>,
    book_type: &'a str,
    review: &'a str,
    rating: f64,
    keywords: &'a [String],
}

/// Validate a record about to be persisted
pub fn validate_book(book: &CanonicalBook) -> Result<(), ValidationError> {
    check(&Fields {
        title: &book.title,
        author: &book.author,
        status: Some(book.status),
        book_type: &book.book_type,
        review: &book.review,
        rating: book.rating,
        keywords: &book.keywords,
    })
}

/// Validate form input and resolve its status label
pub fn validate_draft(draft: &BookDraft) -> Result<ReadingStatus, ValidationError> {
    let status = ReadingStatus::from_canonical(&draft.status);
    check(&Fields {
        title: &draft.title,
        author: &draft.author,
        status,
        book_type: &draft.book_type,
        review: &draft.review,
        rating: draft.rating,
        keywords: &draft.keywords,
    })?;
    status.ok_or(ValidationError::InvalidStatus)
}

fn check(fields: &Fields<'_>) -> Result<(), ValidationError> {
    // Presence
    if fields.title.trim().is_empty() {
        return Err(ValidationError::MissingTitle);
    }

    // Length limits count characters, not bytes
    if char_len(fields.title) > MAX_TITLE_LENGTH {
        return Err(ValidationError::TitleTooLong);
    }
    if char_len(fields.author) > MAX_AUTHOR_LENGTH {
        return Err(ValidationError::AuthorTooLong);
    }
    if char_len(fields.review) > MAX_REVIEW_LENGTH {
        return Err(ValidationError::ReviewTooLong);
    }

    if fields.status.is_none() {
        return Err(ValidationError::InvalidStatus);
    }

    if fields.book_type.trim().is_empty() {
        return Err(ValidationError::MissingType);
    }
    if char_len(fields.book_type) > MAX_TYPE_LENGTH {
        return Err(ValidationError::TypeTooLong);
    }

    // NaN fails both comparisons, so test the accepted range directly
    if !(0.0..=MAX_RATING).contains(&fields.rating) {
        return Err(ValidationError::RatingOutOfRange);
    }

    if fields.keywords.len() > MAX_KEYWORDS_COUNT {
        return Err(ValidationError::TooManyKeywords);
    }
    if let Some(bad) = fields
        .keywords
        .iter()
        .find(|k| char_len(k) > MAX_KEYWORD_LENGTH)
    {
        return Err(ValidationError::InvalidKeyword(bad.clone()));
    }

    if [fields.title, fields.author, fields.review]
        .iter()
        .any(|text| SCRIPT_PATTERN.is_match(text))
    {
        return Err(ValidationError::ScriptInjection);
    }

    Ok(())
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
