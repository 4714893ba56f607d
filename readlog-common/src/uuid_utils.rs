//! UUID utilities

use uuid::Uuid;

/// Generate a new UUIDv4
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// New opaque book identifier
pub fn new_book_id() -> String {
    generate().to_string()
}
