//! Output module for Phase 2 results and run reports
//!
//! This module handles:
//! - Appending extraction records to size-capped CSV files per category
//! - Recovering the output state by scanning existing files
//! - Recording and displaying run statistics

mod sink;
pub mod stats;

pub use sink::{output_file_name, scan_category_dir, CategorySink, OutputScan};
pub use stats::{print_crawl_stats, print_extraction_stats, CrawlStats, ExtractionStats};

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
