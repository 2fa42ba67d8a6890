//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `Category`: The fixed set of site sections that are crawled independently
//! - `ProgressState`: Per-category cursor of the last fully processed page

mod category;
mod progress;

// Re-export main types
pub use category::Category;
pub use progress::{Advance, ProgressState};
