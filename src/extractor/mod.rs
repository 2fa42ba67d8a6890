//! Field extraction for Phase 2
//!
//! A [`FieldExtractor`] turns one saved post into an [`ExtractionRecord`].
//! Extractors run on blocking worker threads, so they must be `Send + Sync`
//! and must report malformed pages as errors rather than panic.

mod judgment;
mod record;
pub mod text;

pub use judgment::JudgmentExtractor;
pub use record::{Comment, ExtractionRecord, RelatedItem, EMPTY_LIST, HEADERS};

use crate::state::Category;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while extracting one post
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unrecognised page template in {0}")]
    UnrecognisedTemplate(PathBuf),

    #[error("Failed to encode {field}: {source}")]
    Encode {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Everything an extractor gets to see about one post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionInput {
    /// Ledger id of the post
    pub unique_id: String,

    /// Category derived from the saved file's location
    pub category: Category,

    /// Source URL of the post
    pub post_url: String,

    /// Saved post HTML
    pub post_path: PathBuf,

    /// Listing page saved next to the post, if any
    pub category_page_path: Option<PathBuf>,
}

/// Turns a saved post into a fixed-schema record
pub trait FieldExtractor: Send + Sync {
    /// Extracts every column for `input`
    ///
    /// Columns the page does not provide keep their defaults.
    fn extract(&self, input: &ExtractionInput) -> Result<ExtractionRecord, ExtractError>;
}
