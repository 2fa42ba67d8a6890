//! Storage module for persisting crawl data
//!
//! This module handles every piece of state that survives a restart:
//! - The append-only ledger of fetched posts
//! - The per-category progress tracker
//! - The raw HTML cache of listing pages and posts

mod layout;
mod ledger;
mod progress;
mod traits;

pub use layout::{category_of, sibling_category_page, HtmlCache, CATEGORY_PAGE_FILE};
pub use ledger::{load_entries, Ledger, RepairOutcome, LEDGER_HEADER};
pub use progress::{CsvProgressStore, PROGRESS_HEADER};
pub use traits::{MemoryProgressStore, ProgressStore, StorageError, StorageResult};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One successfully fetched post, as recorded in the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Content-addressed id derived from `post_url`
    pub unique_id: String,

    /// Where the raw post HTML was saved
    pub file_path: PathBuf,

    /// Source URL of the post
    pub post_url: String,
}
