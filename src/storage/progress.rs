//! CSV-backed progress tracker
//!
//! The file has the header `category,last_page` and one row per category.
//! It is never edited in place: every save writes a complete new copy to a
//! temporary sibling and renames it over the old one.

use crate::state::{Category, ProgressState};
use crate::storage::traits::{ProgressStore, StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Column names of the progress file, in order
pub const PROGRESS_HEADER: [&str; 2] = ["category", "last_page"];

#[derive(Debug, Serialize, Deserialize)]
struct ProgressRow {
    category: String,
    last_page: u32,
}

/// Progress store persisted as a small CSV file
#[derive(Debug, Clone)]
pub struct CsvProgressStore {
    path: PathBuf,
}

impl CsvProgressStore {
    /// Creates a store backed by the file at `path` (created on first save)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ProgressStore for CsvProgressStore {
    fn load(&self) -> StorageResult<ProgressState> {
        let meta = match fs::metadata(&self.path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ProgressState::new());
            }
            Err(e) => return Err(e.into()),
        };
        if meta.len() == 0 {
            return Ok(ProgressState::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)?;

        let header = reader.headers()?.clone();
        if !header.iter().eq(PROGRESS_HEADER.iter().copied()) {
            return Err(StorageError::MalformedHeader {
                path: self.path.clone(),
                expected: PROGRESS_HEADER.iter().map(|s| s.to_string()).collect(),
                found: header.iter().map(|s| s.to_string()).collect(),
            });
        }

        let mut state = ProgressState::new();
        for (index, row) in reader.deserialize::<ProgressRow>().enumerate() {
            let line = index as u64 + 2;
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    tracing::warn!(
                        "Ignoring unreadable progress row {} in {}: {}",
                        line,
                        self.path.display(),
                        e
                    );
                    continue;
                }
            };

            match Category::from_slug(&row.category) {
                Some(category) if row.last_page >= 1 => {
                    state.advance(category, row.last_page);
                }
                Some(_) => {
                    return Err(StorageError::InvalidRow {
                        path: self.path.clone(),
                        line,
                        message: "last_page must be >= 1".to_string(),
                    });
                }
                None => {
                    tracing::warn!(
                        "Ignoring progress for unknown category '{}' in {}",
                        row.category,
                        self.path.display()
                    );
                }
            }
        }

        tracing::debug!("Progress loaded for {} categories", state.len());
        Ok(state)
    }

    fn save(&self, state: &ProgressState) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = self.path.with_extension("csv.tmp");
        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_path(&temp_path)?;
            writer.write_record(PROGRESS_HEADER)?;
            for (category, last_page) in state.iter() {
                writer.serialize(ProgressRow {
                    category: category.slug().to_string(),
                    last_page,
                })?;
            }
            writer.flush()?;
        }
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}
