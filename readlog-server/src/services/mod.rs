//! Outbound service clients

pub mod suggest;

pub use suggest::{AiSuggestion, GeminiClient, MetadataSuggester, SuggestError};
