//! Append-only ledger of fetched posts
//!
//! The ledger is a CSV file with the header `unique_id,file_path,post_url`.
//! Rows are appended and flushed one at a time, so an interrupted run can
//! at worst leave a truncated final row; every earlier row stays intact.
//! Duplicate ids (possible after a crash between saving and recording) are
//! collapsed on load, first row wins.

use crate::storage::traits::{StorageError, StorageResult};
use crate::storage::LedgerEntry;
use std::collections::{HashMap, HashSet};
use std::fs::{self, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Column names of the ledger file, in order
pub const LEDGER_HEADER: [&str; 3] = ["unique_id", "file_path", "post_url"];

/// Outcome of [`Ledger::repair`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairOutcome {
    /// The file was missing or empty and now holds just the header
    Created,
    /// The header was already correct; nothing was written
    AlreadyValid,
    /// A header was written in front of the existing rows
    HeaderInserted {
        /// Whether the old first line was kept as a data row
        kept_first_row: bool,
    },
}

/// Writable handle on the ledger file
///
/// Tracks the ids already recorded so that a post is never appended twice
/// by the same process.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    recorded: HashMap<String, PathBuf>,
}

impl Ledger {
    /// Opens the ledger for appending, creating it with a header if it is
    /// missing or empty
    ///
    /// # Errors
    ///
    /// Returns `StorageError::MalformedHeader` when the existing file does
    /// not start with the expected header; run [`Ledger::repair`] first.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if is_missing_or_empty(path)? {
            write_header_only(path)?;
            tracing::info!("Created ledger {}", path.display());
            return Ok(Self {
                path: path.to_path_buf(),
                recorded: HashMap::new(),
            });
        }

        let entries = read_entries(path)?;
        drop_partial_tail(path)?;

        let recorded = entries
            .into_iter()
            .map(|e| (e.unique_id, e.file_path))
            .collect::<HashMap<_, _>>();

        tracing::info!(
            "Opened ledger {} with {} recorded posts",
            path.display(),
            recorded.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            recorded,
        })
    }

    /// Returns true if `unique_id` already has a row
    pub fn contains(&self, unique_id: &str) -> bool {
        self.recorded.contains_key(unique_id)
    }

    /// Saved file path recorded for `unique_id`
    pub fn file_path(&self, unique_id: &str) -> Option<&Path> {
        self.recorded.get(unique_id).map(PathBuf::as_path)
    }

    /// Number of distinct posts recorded
    pub fn len(&self) -> usize {
        self.recorded.len()
    }

    /// Returns true if no post has been recorded
    pub fn is_empty(&self) -> bool {
        self.recorded.is_empty()
    }

    /// Appends one entry and flushes it to disk
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The row was written
    /// * `Ok(false)` - The id was already recorded; nothing was written
    pub fn append(&mut self, entry: &LedgerEntry) -> StorageResult<bool> {
        if self.contains(&entry.unique_id) {
            tracing::debug!("Ledger already has {}", entry.unique_id);
            return Ok(false);
        }

        let file = OpenOptions::new().append(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.serialize(entry)?;
        writer.flush()?;

        self.recorded
            .insert(entry.unique_id.clone(), entry.file_path.clone());
        tracing::debug!("Added to ledger: {}", entry.unique_id);
        Ok(true)
    }

    /// Rewrites the ledger so that it starts with the expected header
    ///
    /// - Missing or empty file: created with the header only.
    /// - Correct header: left untouched.
    /// - Anything else: the header is inserted. The old first line is kept
    ///   as data if it has exactly three fields and dropped otherwise.
    ///
    /// The rewrite goes through a temporary sibling file that is renamed
    /// over the original.
    pub fn repair(path: &Path) -> StorageResult<RepairOutcome> {
        if is_missing_or_empty(path)? {
            write_header_only(path)?;
            tracing::info!("Ledger {} was empty; created with header", path.display());
            return Ok(RepairOutcome::Created);
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;
        let mut rows = reader.records();

        let first = match rows.next() {
            Some(row) => row?,
            None => {
                write_header_only(path)?;
                return Ok(RepairOutcome::Created);
            }
        };

        if first.iter().eq(LEDGER_HEADER.iter().copied()) {
            tracing::info!("Ledger {} already has the correct header", path.display());
            return Ok(RepairOutcome::AlreadyValid);
        }

        let temp_path = temp_sibling(path);
        let result = (|| -> StorageResult<bool> {
            let mut writer = csv::Writer::from_path(&temp_path)?;
            writer.write_record(LEDGER_HEADER)?;

            let kept_first_row = first.len() == LEDGER_HEADER.len();
            if kept_first_row {
                writer.write_record(&first)?;
            } else {
                tracing::warn!(
                    "Dropping malformed first line of {}: {:?}",
                    path.display(),
                    first
                );
            }

            for row in rows {
                writer.write_record(&row?)?;
            }
            writer.flush()?;
            Ok(kept_first_row)
        })();
        drop(reader);

        match result {
            Ok(kept_first_row) => {
                fs::rename(&temp_path, path)?;
                tracing::info!("Repaired ledger header in {}", path.display());
                Ok(RepairOutcome::HeaderInserted { kept_first_row })
            }
            Err(e) => {
                let _ = fs::remove_file(&temp_path);
                Err(e)
            }
        }
    }
}

/// Loads every ledger entry for extraction
///
/// A missing or empty file yields no entries. A file whose header does not
/// match is logged as an error and also yields no entries; the run carries
/// on without work rather than failing.
pub fn load_entries(path: &Path) -> StorageResult<Vec<LedgerEntry>> {
    if is_missing_or_empty(path)? {
        tracing::info!("Ledger {} is empty", path.display());
        return Ok(Vec::new());
    }

    match read_entries(path) {
        Ok(entries) => {
            tracing::info!("Loaded {} entries from ledger", entries.len());
            Ok(entries)
        }
        Err(e @ StorageError::MalformedHeader { .. }) => {
            tracing::error!("{}; no ledger entries loaded", e);
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

/// Reads and de-duplicates the rows of an existing ledger file
///
/// An unterminated final row was cut short by a crash and is ignored.
fn read_entries(path: &Path) -> StorageResult<Vec<LedgerEntry>> {
    let bytes = fs::read(path)?;
    let complete = &bytes[..complete_len(&bytes)];
    if complete.len() < bytes.len() {
        tracing::warn!("Ignoring unterminated last row of {}", path.display());
    }
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(complete);

    let header = reader.headers()?.clone();
    if !header.iter().eq(LEDGER_HEADER.iter().copied()) {
        return Err(StorageError::MalformedHeader {
            path: path.to_path_buf(),
            expected: LEDGER_HEADER.iter().map(|s| s.to_string()).collect(),
            found: header.iter().map(|s| s.to_string()).collect(),
        });
    }

    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    let mut duplicates = 0usize;

    for (index, row) in reader.deserialize::<LedgerEntry>().enumerate() {
        match row {
            Ok(entry) if entry.unique_id.is_empty() => {
                tracing::warn!("Skipping ledger row {} with empty id", index + 2);
            }
            Ok(entry) => {
                if seen.insert(entry.unique_id.clone()) {
                    entries.push(entry);
                } else {
                    duplicates += 1;
                }
            }
            Err(e) => {
                tracing::warn!("Skipping unreadable ledger row {}: {}", index + 2, e);
            }
        }
    }

    if duplicates > 0 {
        tracing::debug!("Collapsed {} duplicate ledger rows", duplicates);
    }

    Ok(entries)
}

fn is_missing_or_empty(path: &Path) -> StorageResult<bool> {
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.len() == 0),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
        Err(e) => Err(e.into()),
    }
}

fn write_header_only(path: &Path) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(LEDGER_HEADER)?;
    writer.flush()?;
    Ok(())
}

/// Length of the part of `bytes` that ends on a row terminator
///
/// A file without any newline is a lone header line and is kept whole.
fn complete_len(bytes: &[u8]) -> usize {
    if bytes.last() == Some(&b'\n') {
        return bytes.len();
    }
    match bytes.iter().rposition(|&b| b == b'\n') {
        Some(last_newline) => last_newline + 1,
        None => bytes.len(),
    }
}

/// Cuts an unterminated final row off the file so the next append starts
/// a fresh row
fn drop_partial_tail(path: &Path) -> StorageResult<()> {
    let bytes = fs::read(path)?;
    if bytes.is_empty() || bytes.last() == Some(&b'\n') {
        return Ok(());
    }

    let mut file = OpenOptions::new().write(true).open(path)?;
    let keep = complete_len(&bytes);
    if keep < bytes.len() {
        tracing::warn!(
            "Ledger {} ends with a partial row; dropping it",
            path.display()
        );
        file.set_len(keep as u64)?;
    } else {
        file.seek(SeekFrom::End(0))?;
        file.write_all(b"\n")?;
    }
    file.sync_all()?;
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".temp");
    path.with_file_name(name)
}
