//! Integration tests for the Phase 2 extraction pipeline
//!
//! Each test lays out an HTML cache and a ledger the way Phase 1 leaves
//! them, then runs the pipeline over it.

use judgment_harvest::config::Config;
use judgment_harvest::extractor::{
    ExtractError, ExtractionInput, ExtractionRecord, FieldExtractor, HEADERS,
};
use judgment_harvest::pipeline::ExtractionPipeline;
use judgment_harvest::state::Category;
use judgment_harvest::storage::{HtmlCache, Ledger, LedgerEntry};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

fn create_test_config(dir: &Path, max_rows: usize) -> Config {
    let mut config = Config::default();
    config.storage.data_dir = dir.join("data");
    config.storage.output_dir = dir.join("extracted_data");
    config.storage.ledger_file = dir.join("ledger.csv");
    config.storage.progress_file = dir.join("progress_tracker.csv");
    config.extraction.max_rows_per_file = max_rows;
    config.extraction.workers = 3;
    config
}

fn post_html(title: &str) -> String {
    format!(
        r#"<html><body><article>
        <h1 class="entry-title">{title}</h1>
        <div class="entry-content">
          <p>Court: Delhi High Court<br>Assessment Year: 2015-16</p>
          <p>Summary of {title}.</p>
        </div></article></body></html>"#,
        title = title
    )
}

/// Saves `count` posts under `category` page 1 and records them in the ledger
fn seed_posts(config: &Config, category: Category, count: usize) -> Vec<String> {
    let cache = HtmlCache::new(config.storage.data_dir.clone());
    let mut ledger = Ledger::open(&config.storage.ledger_file).unwrap();
    let mut ids = Vec::new();

    for i in 0..count {
        let id = format!("{}-{}", category.slug(), i);
        let path = cache.post_path(category, 1, &id);
        cache
            .save(&path, &post_html(&format!("Appellant {} vs. Revenue", i)))
            .unwrap();
        ledger
            .append(&LedgerEntry {
                unique_id: id.clone(),
                file_path: path,
                post_url: format!("https://example.com/archives/post-{}/", i),
            })
            .unwrap();
        ids.push(id);
    }
    ids
}

fn output_file(config: &Config, category: Category, index: u32) -> PathBuf {
    config
        .storage
        .output_dir
        .join(category.slug())
        .join(format!("extracted_{}.csv", index))
}

/// Header and data rows of an output file
fn read_output(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().iter().map(String::from).collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect();
    (headers, rows)
}

#[tokio::test]
async fn test_rotation_splits_rows_two_two_one() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), 2);
    let ids = seed_posts(&config, Category::Tribunal, 5);

    let stats = ExtractionPipeline::new(config.clone()).run().await.unwrap();
    assert_eq!(stats.written, 5);
    assert_eq!(stats.files_touched, 3);

    let mut seen = Vec::new();
    for (index, expected_rows) in [(1, 2), (2, 2), (3, 1)] {
        let (headers, rows) = read_output(&output_file(&config, Category::Tribunal, index));
        assert_eq!(headers, HEADERS.to_vec());
        assert_eq!(rows.len(), expected_rows);
        seen.extend(rows.into_iter().map(|row| row[0].clone()));
    }
    assert!(!output_file(&config, Category::Tribunal, 4).exists());

    seen.sort();
    let mut expected = ids;
    expected.sort();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn test_second_run_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), 100);
    seed_posts(&config, Category::Aar, 3);

    let first = ExtractionPipeline::new(config.clone()).run().await.unwrap();
    assert_eq!(first.written, 3);
    let before = std::fs::read_to_string(output_file(&config, Category::Aar, 1)).unwrap();

    let second = ExtractionPipeline::new(config.clone()).run().await.unwrap();
    assert_eq!(second.written, 0);
    assert_eq!(second.skipped, 3);
    assert_eq!(second.files_touched, 0);

    let after = std::fs::read_to_string(output_file(&config, Category::Aar, 1)).unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_resume_fills_open_file_before_rotating() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), 2);
    seed_posts(&config, Category::HighCourt, 3);
    ExtractionPipeline::new(config.clone()).run().await.unwrap();

    // Two more posts arrive after the first extraction
    let cache = HtmlCache::new(config.storage.data_dir.clone());
    let mut ledger = Ledger::open(&config.storage.ledger_file).unwrap();
    for id in ["late-1", "late-2"] {
        let path = cache.post_path(Category::HighCourt, 2, id);
        cache.save(&path, &post_html("Late vs. Revenue")).unwrap();
        ledger
            .append(&LedgerEntry {
                unique_id: id.to_string(),
                file_path: path,
                post_url: format!("https://example.com/archives/{}/", id),
            })
            .unwrap();
    }

    let stats = ExtractionPipeline::new(config.clone()).run().await.unwrap();
    assert_eq!(stats.written, 2);
    assert_eq!(stats.skipped, 3);

    let (_, second) = read_output(&output_file(&config, Category::HighCourt, 2));
    let (_, third) = read_output(&output_file(&config, Category::HighCourt, 3));
    assert_eq!(second.len(), 2);
    assert_eq!(third.len(), 1);
}

#[tokio::test]
async fn test_rows_have_every_column() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), 100);
    seed_posts(&config, Category::HighCourt, 1);

    ExtractionPipeline::new(config.clone()).run().await.unwrap();

    let (headers, rows) = read_output(&output_file(&config, Category::HighCourt, 1));
    assert_eq!(headers.len(), 23);
    let row = &rows[0];
    assert_eq!(row.len(), 23);

    let column = |name: &str| &row[headers.iter().position(|h| h == name).unwrap()];
    assert_eq!(column("category"), "high-court");
    assert_eq!(column("title"), "Appellant 0 vs. Revenue");
    assert_eq!(column("appellant"), "Appellant 0");
    assert_eq!(column("respondent"), "Revenue");
    assert_eq!(column("court"), "Delhi High Court");
    assert_eq!(column("assessment_year"), "2015-16");
    assert_eq!(column("summary"), "Summary of Appellant 0 vs. Revenue.");
    for list in ["judges", "counsel", "keywords", "comments", "related_items"] {
        assert_eq!(column(list), "[]", "{}", list);
    }
    assert_eq!(column("bench"), "");
    assert_eq!(column("pdf_url"), "");
}

#[tokio::test]
async fn test_row_cut_short_by_crash_is_extracted_again() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), 100);
    seed_posts(&config, Category::Aar, 1);

    // A crash stopped the previous run partway through writing the row
    let path = output_file(&config, Category::Aar, 1);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(
        &path,
        format!("{}\naar-0,aar,https://example.com/", HEADERS.join(",")),
    )
    .unwrap();

    let stats = ExtractionPipeline::new(config.clone()).run().await.unwrap();
    assert_eq!(stats.written, 1);
    assert_eq!(stats.skipped, 0);

    let (_, rows) = read_output(&path);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].len(), 23);
    assert_eq!(rows[0][0], "aar-0");
}

/// Fails for one id, succeeds for the rest
struct FailsFor(&'static str);

impl FieldExtractor for FailsFor {
    fn extract(&self, input: &ExtractionInput) -> Result<ExtractionRecord, ExtractError> {
        if input.unique_id == self.0 {
            return Err(ExtractError::UnrecognisedTemplate(input.post_path.clone()));
        }
        Ok(ExtractionRecord {
            unique_id: input.unique_id.clone(),
            ..ExtractionRecord::default()
        })
    }
}

#[tokio::test]
async fn test_failed_extraction_is_dropped_and_retried_later() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), 100);
    seed_posts(&config, Category::Others, 3);

    let stats = ExtractionPipeline::with_extractor(config.clone(), Arc::new(FailsFor("others-1")))
        .run()
        .await
        .unwrap();
    assert_eq!(stats.written, 2);
    assert_eq!(stats.failed, 1);

    let (_, rows) = read_output(&output_file(&config, Category::Others, 1));
    assert!(rows.iter().all(|row| row[0] != "others-1"));

    // Not recorded anywhere, so the next run tries it again
    let stats = ExtractionPipeline::new(config.clone()).run().await.unwrap();
    assert_eq!(stats.written, 1);
    assert_eq!(stats.skipped, 2);
}

/// Panics for every input
struct Panics;

impl FieldExtractor for Panics {
    fn extract(&self, _input: &ExtractionInput) -> Result<ExtractionRecord, ExtractError> {
        panic!("extractor bug");
    }
}

#[tokio::test]
async fn test_worker_panic_is_a_failure() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), 100);
    seed_posts(&config, Category::Aar, 2);

    let stats = ExtractionPipeline::with_extractor(config.clone(), Arc::new(Panics))
        .run()
        .await
        .unwrap();
    assert_eq!(stats.written, 0);
    assert_eq!(stats.failed, 2);
    assert!(!output_file(&config, Category::Aar, 1).exists());
}

#[tokio::test]
async fn test_missing_ledger_extracts_nothing() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), 100);

    let stats = ExtractionPipeline::new(config).run().await.unwrap();
    assert_eq!(stats.written, 0);
    assert_eq!(stats.failed, 0);
}
