//! Crawler module for Phase 1
//!
//! This module contains the crawling logic:
//! - HTTP fetching with retry, backoff and user-agent rotation
//! - "Read more" link extraction from category listing pages
//! - Per-category pagination with resumable progress

mod coordinator;
mod fetcher;
mod parser;

pub use coordinator::{run_crawl, sample_delay, Coordinator, StopReason};
pub use fetcher::{build_http_client, FetchOutcome, Fetcher, RetryPolicy};
pub use parser::extract_post_urls;
