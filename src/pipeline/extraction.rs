//! Extraction pipeline implementation

use crate::config::Config;
use crate::extractor::{ExtractError, ExtractionInput, ExtractionRecord, FieldExtractor, JudgmentExtractor};
use crate::output::{scan_category_dir, CategorySink, ExtractionStats};
use crate::state::Category;
use crate::storage::{category_of, load_entries, sibling_category_page, LedgerEntry};
use crate::HarvestError;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::{JoinError, JoinSet};

/// Result of one worker: the input it was given and what came out
type WorkerResult = (ExtractionInput, Result<ExtractionRecord, ExtractError>);

/// Phase 2 runner
pub struct ExtractionPipeline {
    config: Arc<Config>,
    extractor: Arc<dyn FieldExtractor>,
    stats: ExtractionStats,
}

impl ExtractionPipeline {
    /// Creates a pipeline using the judgment post extractor
    pub fn new(config: Config) -> Self {
        let extractor = JudgmentExtractor::new(config.extraction.summary_policy);
        Self::with_extractor(config, Arc::new(extractor))
    }

    /// Creates a pipeline around a custom extractor
    pub fn with_extractor(config: Config, extractor: Arc<dyn FieldExtractor>) -> Self {
        Self {
            config: Arc::new(config),
            extractor,
            stats: ExtractionStats::default(),
        }
    }

    /// Runs extraction over the whole ledger
    ///
    /// Extraction failures are logged and skipped; errors reading the
    /// ledger or writing output files end the run.
    pub async fn run(&mut self) -> Result<ExtractionStats, HarvestError> {
        let start_time = std::time::Instant::now();
        self.stats.started_at = Some(chrono::Utc::now());

        let entries = load_entries(&self.config.storage.ledger_file)?;
        tracing::info!("Loaded {} ledger entries", entries.len());

        for (category, entries) in self.group_by_category(entries) {
            self.extract_category(category, entries).await?;
        }

        self.stats.elapsed = start_time.elapsed();
        tracing::info!(
            "Extraction completed: {} written, {} already extracted, {} failed in {:?}",
            self.stats.written,
            self.stats.skipped,
            self.stats.failed,
            self.stats.elapsed
        );

        Ok(self.stats.clone())
    }

    /// Groups entries by the category directory of their saved file
    fn group_by_category(&mut self, entries: Vec<LedgerEntry>) -> BTreeMap<Category, Vec<LedgerEntry>> {
        let mut groups: BTreeMap<Category, Vec<LedgerEntry>> = BTreeMap::new();
        for entry in entries {
            match category_of(&entry.file_path) {
                Some(category) => groups.entry(category).or_default().push(entry),
                None => {
                    tracing::warn!(
                        "Cannot tell the category of {} ({}); skipping",
                        entry.file_path.display(),
                        entry.unique_id
                    );
                    self.stats.uncategorised += 1;
                }
            }
        }
        groups
    }

    /// Extracts every not yet extracted entry of one category
    async fn extract_category(
        &mut self,
        category: Category,
        entries: Vec<LedgerEntry>,
    ) -> Result<(), HarvestError> {
        let dir = self.config.storage.output_dir.join(category.slug());
        let scan = scan_category_dir(&dir)?;
        let mut seen = scan.seen.clone();
        let mut sink = CategorySink::new(&dir, self.config.extraction.max_rows_per_file, &scan);

        let mut pending = Vec::new();
        for entry in entries {
            if !seen.insert(entry.unique_id.clone()) {
                tracing::debug!("Already extracted: {}", entry.unique_id);
                self.stats.skipped += 1;
                continue;
            }
            pending.push(ExtractionInput {
                category_page_path: sibling_category_page(&entry.file_path),
                unique_id: entry.unique_id,
                category,
                post_url: entry.post_url,
                post_path: entry.file_path,
            });
        }

        if pending.is_empty() {
            tracing::info!("Nothing new to extract for '{}'", category);
            return Ok(());
        }

        let workers = self.config.extraction.effective_workers().max(1);
        tracing::info!(
            "Extracting {} posts for '{}' with {} workers",
            pending.len(),
            category,
            workers
        );

        let mut tasks: JoinSet<WorkerResult> = JoinSet::new();
        for input in pending {
            while tasks.len() >= workers {
                if let Some(joined) = tasks.join_next().await {
                    self.handle_result(joined, &mut sink)?;
                }
            }

            let extractor = Arc::clone(&self.extractor);
            tasks.spawn_blocking(move || {
                let result = extractor.extract(&input);
                (input, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            self.handle_result(joined, &mut sink)?;
        }

        sink.finish()?;
        self.stats.files_touched += sink.files_touched().len() as u64;
        Ok(())
    }

    /// Writes a finished extraction, or logs why there is nothing to write
    fn handle_result(
        &mut self,
        joined: Result<WorkerResult, JoinError>,
        sink: &mut CategorySink,
    ) -> Result<(), HarvestError> {
        match joined {
            Ok((input, Ok(record))) => {
                sink.write(&record)?;
                self.stats.written += 1;
                tracing::debug!("Extracted {} from {}", input.unique_id, input.post_path.display());
            }
            Ok((input, Err(e))) => {
                tracing::error!("Failed to extract {}: {}", input.unique_id, e);
                self.stats.failed += 1;
            }
            Err(e) => {
                tracing::error!("Extraction worker failed: {}", e);
                self.stats.failed += 1;
            }
        }
        Ok(())
    }
}

/// Runs Phase 2 with the judgment post extractor
pub async fn run_extraction(config: Config) -> Result<ExtractionStats, HarvestError> {
    ExtractionPipeline::new(config).run().await
}
