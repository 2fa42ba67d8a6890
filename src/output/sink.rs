//! Size-capped CSV output files
//!
//! ```text
//! {output_dir}/
//! └── {category}/
//!     ├── extracted_1.csv   # full: max_rows_per_file data rows
//!     ├── extracted_2.csv   # full
//!     └── extracted_3.csv   # open: rows are appended here
//! ```
//!
//! Nothing about the file set is stored elsewhere. Which ids were already
//! written, which file is open and how many rows it holds are all
//! recovered by [`scan_category_dir`].

use crate::extractor::{ExtractionRecord, HEADERS};
use crate::output::OutputResult;
use std::collections::{BTreeSet, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::Read;
use std::path::{Path, PathBuf};

const FILE_PREFIX: &str = "extracted_";
const FILE_SUFFIX: &str = ".csv";

/// File name of output file number `index`
pub fn output_file_name(index: u32) -> String {
    format!("{}{}{}", FILE_PREFIX, index, FILE_SUFFIX)
}

/// Index of an output file from its name
fn parse_index(name: &str) -> Option<u32> {
    name.strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_SUFFIX)?
        .parse()
        .ok()
}

/// State of a category's output directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputScan {
    /// Ids found in the `unique_id` column of any output file
    pub seen: HashSet<String>,

    /// Highest existing file index, or None if there are no files
    pub last_index: Option<u32>,

    /// Data rows in the highest-index file
    pub last_rows: usize,
}

/// Scans `dir` for output files
///
/// Files are read in numeric order. A file without a `unique_id` header
/// still counts for numbering but contributes no ids. A missing directory
/// scans as empty.
pub fn scan_category_dir(dir: &Path) -> OutputResult<OutputScan> {
    let mut scan = OutputScan::default();
    if !dir.is_dir() {
        return Ok(scan);
    }

    let mut files: Vec<(u32, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if let Some(index) = name.to_str().and_then(parse_index) {
            files.push((index, entry.path()));
        }
    }
    files.sort_by_key(|(index, _)| *index);

    for (index, path) in files {
        let rows = read_output_file(&path, &mut scan.seen)?;
        scan.last_index = Some(index);
        scan.last_rows = rows;
    }

    tracing::debug!(
        "Scanned {}: {} ids, last file {:?} with {} rows",
        dir.display(),
        scan.seen.len(),
        scan.last_index,
        scan.last_rows
    );
    Ok(scan)
}

/// Reads one output file, adding its ids to `seen`; returns its row count
///
/// Only whole rows count: an unterminated last line and any row whose
/// field count differs from the header are ignored.
fn read_output_file(path: &Path, seen: &mut HashSet<String>) -> OutputResult<usize> {
    let bytes = fs::read(path)?;
    let complete = &bytes[..complete_len(&bytes)];
    if complete.len() < bytes.len() {
        tracing::warn!("Ignoring unterminated last row of {}", path.display());
    }
    if complete.is_empty() {
        return Ok(0);
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(complete);

    let headers = reader.headers()?.clone();
    let id_column = headers.iter().position(|h| h.trim() == "unique_id");
    if id_column.is_none() {
        tracing::warn!(
            "{} has no unique_id column; its rows cannot be de-duplicated",
            path.display()
        );
    }

    let mut rows = 0;
    for result in reader.records() {
        let record = match result {
            Ok(record) if record.len() == headers.len() => record,
            Ok(record) => {
                tracing::warn!(
                    "Ignoring row with {} of {} fields in {}",
                    record.len(),
                    headers.len(),
                    path.display()
                );
                continue;
            }
            Err(e) => {
                tracing::warn!("Skipping unreadable row in {}: {}", path.display(), e);
                continue;
            }
        };
        rows += 1;
        if let Some(id) = id_column.and_then(|i| record.get(i)) {
            if !id.is_empty() {
                seen.insert(id.to_string());
            }
        }
    }

    Ok(rows)
}

/// Length of the part of `bytes` up to and including its last newline
fn complete_len(bytes: &[u8]) -> usize {
    bytes
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |last_newline| last_newline + 1)
}

/// Appends records to one category's output files, rotating at the cap
///
/// The open file is flushed after every row and closed on rotation, on
/// [`CategorySink::finish`], and on drop.
pub struct CategorySink {
    dir: PathBuf,
    max_rows: usize,
    index: u32,
    rows: usize,
    writer: Option<csv::Writer<File>>,
    touched: BTreeSet<PathBuf>,
}

impl CategorySink {
    /// Creates a sink continuing from a scan of `dir`
    pub fn new(dir: impl Into<PathBuf>, max_rows: usize, scan: &OutputScan) -> Self {
        Self {
            dir: dir.into(),
            max_rows: max_rows.max(1),
            index: scan.last_index.unwrap_or(1),
            rows: scan.last_rows,
            writer: None,
            touched: BTreeSet::new(),
        }
    }

    /// Path of the file the next row goes to, before any rotation
    pub fn current_path(&self) -> PathBuf {
        self.dir.join(output_file_name(self.index))
    }

    /// Files written to by this sink
    pub fn files_touched(&self) -> &BTreeSet<PathBuf> {
        &self.touched
    }

    /// Appends one record, opening or rotating files as needed
    pub fn write(&mut self, record: &ExtractionRecord) -> OutputResult<()> {
        if self.rows >= self.max_rows {
            self.rotate()?;
        }

        let path = self.current_path();
        if self.writer.is_none() {
            self.writer = Some(open_for_append(&path)?);
        }
        if let Some(writer) = self.writer.as_mut() {
            writer.write_record(record.values())?;
            writer.flush()?;
        }

        self.rows += 1;
        self.touched.insert(path);
        Ok(())
    }

    /// Flushes and closes the open file
    pub fn finish(&mut self) -> OutputResult<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }

    fn rotate(&mut self) -> OutputResult<()> {
        self.finish()?;
        self.index += 1;
        self.rows = 0;
        tracing::info!("Starting new output file {}", self.current_path().display());
        Ok(())
    }
}

impl Drop for CategorySink {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.flush() {
                tracing::error!("Failed to flush {}: {}", self.current_path().display(), e);
            }
        }
    }
}

/// Opens `path` for appending, writing the header if the file is new or empty
///
/// An unterminated last line left by a crash is cut off first, so the new
/// row never joins a fragment.
fn open_for_append(path: &Path) -> OutputResult<csv::Writer<File>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .open(path)?;

    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    let keep = complete_len(&bytes);
    if keep < bytes.len() {
        tracing::warn!(
            "Dropping partial last row of {} ({} bytes)",
            path.display(),
            bytes.len() - keep
        );
        file.set_len(keep as u64)?;
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    if keep == 0 {
        writer.write_record(HEADERS)?;
        writer.flush()?;
    }
    Ok(writer)
}
