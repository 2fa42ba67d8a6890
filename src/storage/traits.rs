//! Storage traits and error types
//!
//! This module defines the interface the crawl orchestrator uses to persist
//! its progress cursor, and the error type shared by all file-backed stores.

use crate::state::ProgressState;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed header in {path}: expected {expected:?}, found {found:?}")]
    MalformedHeader {
        path: PathBuf,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Invalid row {line} in {path}: {message}")]
    InvalidRow {
        path: PathBuf,
        line: u64,
        message: String,
    },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence interface for the per-category progress cursor
///
/// The whole state is read and written at once; implementations must make
/// `save` replace the previous state without ever leaving a half-written
/// copy behind.
pub trait ProgressStore: Send {
    /// Loads the persisted state, or an empty state if none exists yet
    fn load(&self) -> StorageResult<ProgressState>;

    /// Replaces the persisted state with `state`
    fn save(&self, state: &ProgressState) -> StorageResult<()>;
}

impl<T: ProgressStore + Sync> ProgressStore for std::sync::Arc<T> {
    fn load(&self) -> StorageResult<ProgressState> {
        (**self).load()
    }

    fn save(&self, state: &ProgressState) -> StorageResult<()> {
        (**self).save(state)
    }
}

/// Volatile store, used by tests
#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    inner: std::sync::Mutex<ProgressState>,
    history: std::sync::Mutex<Vec<ProgressState>>,
}

impl MemoryProgressStore {
    /// Creates a store that starts from `state`
    pub fn with_state(state: ProgressState) -> Self {
        Self {
            inner: std::sync::Mutex::new(state),
            history: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Every state passed to `save`, oldest first
    pub fn history(&self) -> Vec<ProgressState> {
        self.history
            .lock()
            .map(|h| h.clone())
            .unwrap_or_default()
    }
}

impl ProgressStore for MemoryProgressStore {
    fn load(&self) -> StorageResult<ProgressState> {
        Ok(self
            .inner
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default())
    }

    fn save(&self, state: &ProgressState) -> StorageResult<()> {
        if let Ok(mut inner) = self.inner.lock() {
            *inner = state.clone();
        }
        if let Ok(mut history) = self.history.lock() {
            history.push(state.clone());
        }
        Ok(())
    }
}
