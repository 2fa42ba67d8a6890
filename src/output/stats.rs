//! Run statistics for both phases
//!
//! This module provides the counters each phase fills in while it runs and
//! functions for displaying them once the phase ends.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Phase 1 counters
#[derive(Debug, Clone, Default)]
pub struct CrawlStats {
    /// When the run started
    pub started_at: Option<DateTime<Utc>>,

    /// Categories whose pagination was walked to a stop
    pub categories_crawled: u64,

    /// Listing pages fully handled and recorded in the progress file
    pub pages_completed: u64,

    /// Posts downloaded and saved in this run
    pub posts_fetched: u64,

    /// Posts already on disk that were not downloaded again
    pub posts_reused: u64,

    /// Posts that answered 404
    pub posts_not_found: u64,

    /// Posts given up on after errors
    pub posts_failed: u64,

    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

/// Phase 2 counters
#[derive(Debug, Clone, Default)]
pub struct ExtractionStats {
    /// When the run started
    pub started_at: Option<DateTime<Utc>>,

    /// Records appended to output files
    pub written: u64,

    /// Ledger entries skipped as already extracted or repeated
    pub skipped: u64,

    /// Entries whose extraction failed
    pub failed: u64,

    /// Ledger entries without a recognisable category
    pub uncategorised: u64,

    /// Distinct output files appended to
    pub files_touched: u64,

    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

fn percentage(part: u64, total: u64) -> f64 {
    if total > 0 {
        (part as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

fn print_started(started_at: Option<DateTime<Utc>>) {
    if let Some(started) = started_at {
        println!("  Started: {}", started.to_rfc3339());
    }
}

/// Prints Phase 1 statistics to stdout
pub fn print_crawl_stats(stats: &CrawlStats) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    print_started(stats.started_at);
    println!("  Duration: {:.1}s", stats.elapsed.as_secs_f64());
    println!("  Categories crawled: {}", stats.categories_crawled);
    println!("  Pages completed: {}", stats.pages_completed);
    println!();

    let total = stats.posts_fetched + stats.posts_reused + stats.posts_not_found + stats.posts_failed;
    println!("Posts:");
    println!("  Fetched: {}", stats.posts_fetched);
    println!("  Already saved: {}", stats.posts_reused);
    println!("  Not found: {}", stats.posts_not_found);
    println!("  Failed: {}", stats.posts_failed);
    println!();

    println!(
        "Success Rate: {:.1}% ({} / {} posts available locally)",
        percentage(stats.posts_fetched + stats.posts_reused, total),
        stats.posts_fetched + stats.posts_reused,
        total
    );
}

/// Prints Phase 2 statistics to stdout
pub fn print_extraction_stats(stats: &ExtractionStats) {
    println!("=== Extraction Statistics ===\n");

    println!("Overview:");
    print_started(stats.started_at);
    println!("  Duration: {:.1}s", stats.elapsed.as_secs_f64());
    println!("  Records written: {}", stats.written);
    println!("  Already extracted: {}", stats.skipped);
    println!("  Failed: {}", stats.failed);
    if stats.uncategorised > 0 {
        println!("  Without category: {}", stats.uncategorised);
    }
    println!("  Output files touched: {}", stats.files_touched);
    println!();

    let attempted = stats.written + stats.failed;
    println!(
        "Success Rate: {:.1}% ({} / {} posts extracted)",
        percentage(stats.written, attempted),
        stats.written,
        attempted
    );
}
