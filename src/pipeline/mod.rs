//! Phase 2 pipeline
//!
//! Turns the ledger into per-category output files:
//! - Groups ledger entries by the category their saved file lives under
//! - Skips ids already present in the output files
//! - Extracts the rest on blocking worker threads
//! - Appends results in completion order through one writer per category

mod extraction;

pub use extraction::{run_extraction, ExtractionPipeline};
