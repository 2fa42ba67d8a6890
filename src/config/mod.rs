//! Configuration module for Judgment-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key is optional; anything omitted falls back to the defaults the
//! harvester was originally deployed with.
//!
//! # Example
//!
//! ```no_run
//! use judgment_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Rows per output file: {}", config.extraction.max_rows_per_file);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BackoffPolicy, Config, CrawlConfig, ExtractionConfig, FetchConfig, SiteConfig,
    StorageConfig, SummaryPolicy,
};

// Re-export parser functions
pub use parser::{load_config, load_or_default, parse_config};
pub use validation::validate;
