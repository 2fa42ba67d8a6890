//! Crawler coordinator - Phase 1 orchestration
//!
//! Each category is walked page by page:
//!
//! ```text
//! FetchPage -> ExtractLinks -> FetchPosts -> AdvanceProgress -> FetchPage | Stop
//! ```
//!
//! Pages of one category are strictly sequential because the next page is
//! only worth requesting once the current one has been fully handled. Posts
//! on a page are fetched concurrently. The progress cursor is written only
//! after every post on the page was either saved or given up on, so a crash
//! at any point resumes on a page whose posts are re-checked against the
//! HTML cache instead of being downloaded again.

use crate::config::Config;
use crate::crawler::parser::extract_post_urls;
use crate::crawler::{FetchOutcome, Fetcher};
use crate::output::CrawlStats;
use crate::state::{Advance, Category};
use crate::storage::{CsvProgressStore, HtmlCache, Ledger, LedgerEntry, ProgressStore};
use crate::url::{category_page_url, unique_id};
use crate::HarvestError;
use rand::Rng;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use url::Url;

/// Why the crawl of a category ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The next listing page answered 404: pagination is exhausted
    NotFound { page: u32 },
    /// The listing page could not be fetched
    FetchFailed { page: u32, error: String },
    /// A listing page after the first one had no post links
    EndOfCategory { page: u32 },
    /// The first listing page had no post links; either the category is
    /// empty or the page layout was not understood
    NoLinksOnFirstPage,
}

/// Result of handling one listing page
#[derive(Debug)]
enum PageStep {
    Continue,
    Stop(StopReason),
}

/// Outcome of a single post fetch task
struct PostTask {
    unique_id: String,
    post_url: String,
    save_path: PathBuf,
    outcome: FetchOutcome,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    fetcher: Fetcher,
    ledger: Ledger,
    progress: Box<dyn ProgressStore>,
    cache: HtmlCache,
    stats: CrawlStats,
}

impl Coordinator {
    /// Creates a coordinator using the CSV progress tracker from the configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ledger opened and HTTP client built
    /// * `Err(HarvestError)` - Failed to initialize
    pub fn new(config: Config) -> Result<Self, HarvestError> {
        let store = CsvProgressStore::new(config.storage.progress_file.clone());
        Self::with_progress_store(config, Box::new(store))
    }

    /// Creates a coordinator persisting progress through `progress`
    pub fn with_progress_store(
        config: Config,
        progress: Box<dyn ProgressStore>,
    ) -> Result<Self, HarvestError> {
        let ledger = Ledger::open(&config.storage.ledger_file)?;
        let fetcher = Fetcher::new(&config.fetch)?;
        let cache = HtmlCache::new(config.storage.data_dir.clone());

        Ok(Self {
            config: Arc::new(config),
            fetcher,
            ledger,
            progress,
            cache,
            stats: CrawlStats::default(),
        })
    }

    /// Statistics gathered so far
    pub fn stats(&self) -> &CrawlStats {
        &self.stats
    }

    /// Crawls every configured category in order
    ///
    /// Failures of single pages or posts are logged and skipped; only
    /// persistence errors end the run early.
    pub async fn run(&mut self) -> Result<CrawlStats, HarvestError> {
        let start_time = std::time::Instant::now();
        self.stats.started_at = Some(chrono::Utc::now());
        let categories = self.config.site.categories.clone();

        for category in categories {
            let reason = self.crawl_category(category).await?;
            self.stats.categories_crawled += 1;
            tracing::debug!("Category {} stopped: {:?}", category, reason);
        }

        self.stats.elapsed = start_time.elapsed();
        tracing::info!(
            "Crawl completed: {} pages, {} posts fetched, {} already saved, {} failed in {:?}",
            self.stats.pages_completed,
            self.stats.posts_fetched,
            self.stats.posts_reused,
            self.stats.posts_failed,
            self.stats.elapsed
        );

        Ok(self.stats.clone())
    }

    /// Crawls one category from its resume point until pagination stops
    pub async fn crawl_category(&mut self, category: Category) -> Result<StopReason, HarvestError> {
        let mut page = self.progress.load()?.resume_page(category);
        tracing::info!("Starting category '{}' from page {}", category, page);

        loop {
            match self.crawl_page(category, page).await? {
                PageStep::Continue => {
                    page += 1;
                    self.polite_pause().await;
                }
                PageStep::Stop(reason) => {
                    log_stop(category, &reason);
                    return Ok(reason);
                }
            }
        }
    }

    /// Handles one listing page end to end
    async fn crawl_page(&mut self, category: Category, page: u32) -> Result<PageStep, HarvestError> {
        let page_url = category_page_url(&self.config.site.base_url, category, page);
        tracing::info!("Fetching category page: {}", page_url);

        let body = match self.fetcher.fetch(&page_url).await {
            FetchOutcome::Success { body, .. } => body,
            FetchOutcome::NotFound { .. } => {
                return Ok(PageStep::Stop(StopReason::NotFound { page }));
            }
            FetchOutcome::Failed { error, .. } => {
                return Ok(PageStep::Stop(StopReason::FetchFailed { page, error }));
            }
        };

        let listing_path = self.cache.category_page_path(category, page);
        if let Err(e) = self.cache.save(&listing_path, &body) {
            tracing::warn!(
                "Could not save category page {}: {}",
                listing_path.display(),
                e
            );
        }

        let base = Url::parse(&page_url)?;
        let post_urls = extract_post_urls(&body, &base);

        if post_urls.is_empty() {
            let reason = if page == 1 {
                StopReason::NoLinksOnFirstPage
            } else {
                StopReason::EndOfCategory { page }
            };
            return Ok(PageStep::Stop(reason));
        }

        tracing::info!("Found {} posts on {} page {}", post_urls.len(), category, page);
        self.fetch_posts(category, page, post_urls).await?;
        self.advance_progress(category, page)?;
        self.stats.pages_completed += 1;

        Ok(PageStep::Continue)
    }

    /// Fetches every post of one page, at most `max-workers` at a time
    ///
    /// Returns once every post has been saved, reused, or given up on.
    async fn fetch_posts(
        &mut self,
        category: Category,
        page: u32,
        post_urls: Vec<String>,
    ) -> Result<(), HarvestError> {
        let max_workers = self.config.crawl.max_workers.max(1) as usize;
        let force = self.config.crawl.force_refetch;
        let mut tasks: JoinSet<PostTask> = JoinSet::new();

        for post_url in post_urls {
            let id = unique_id(&post_url);
            let save_path = self.save_path_for(category, page, &id);

            if !force && self.reuse_saved(&id, &post_url, &save_path)? {
                continue;
            }

            while tasks.len() >= max_workers {
                if let Some(joined) = tasks.join_next().await {
                    self.handle_post_result(joined)?;
                }
            }

            let fetcher = self.fetcher.clone();
            tasks.spawn(async move {
                let outcome = fetcher.fetch(&post_url).await;
                PostTask {
                    unique_id: id,
                    post_url,
                    save_path,
                    outcome,
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            self.handle_post_result(joined)?;
        }

        Ok(())
    }

    /// Where a post is (or will be) saved
    ///
    /// A post already in the ledger keeps its recorded path so a re-download
    /// never leaves the ledger pointing at a missing file.
    fn save_path_for(&self, category: Category, page: u32, id: &str) -> PathBuf {
        self.ledger
            .file_path(id)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.cache.post_path(category, page, id))
    }

    /// Skips the network call for a post that is already on disk
    ///
    /// A saved file without a ledger row (crash between the two writes) gets
    /// its row added here.
    fn reuse_saved(
        &mut self,
        id: &str,
        post_url: &str,
        save_path: &Path,
    ) -> Result<bool, HarvestError> {
        if !save_path.is_file() {
            return Ok(false);
        }

        if self.ledger.append(&LedgerEntry {
            unique_id: id.to_string(),
            file_path: save_path.to_path_buf(),
            post_url: post_url.to_string(),
        })? {
            tracing::info!("Recorded previously saved post {}", save_path.display());
        } else {
            tracing::debug!("File already exists: {}. Skipping fetch.", save_path.display());
        }

        self.stats.posts_reused += 1;
        Ok(true)
    }

    /// Saves and records a finished post fetch
    fn handle_post_result(
        &mut self,
        joined: Result<PostTask, tokio::task::JoinError>,
    ) -> Result<(), HarvestError> {
        let task = match joined {
            Ok(task) => task,
            Err(e) => {
                tracing::error!("Post fetch task failed: {}", e);
                self.stats.posts_failed += 1;
                return Ok(());
            }
        };

        let body = match task.outcome {
            FetchOutcome::Success { body, .. } => body,
            FetchOutcome::NotFound { .. } => {
                tracing::warn!("Post does not exist (404): {}", task.post_url);
                self.stats.posts_not_found += 1;
                return Ok(());
            }
            FetchOutcome::Failed { error, .. } => {
                tracing::error!("Giving up on post {}: {}", task.post_url, error);
                self.stats.posts_failed += 1;
                return Ok(());
            }
        };

        if let Err(e) = self.cache.save(&task.save_path, &body) {
            tracing::error!(
                "Failed to save post {} to {}: {}",
                task.post_url,
                task.save_path.display(),
                e
            );
            self.stats.posts_failed += 1;
            return Ok(());
        }

        self.ledger.append(&LedgerEntry {
            unique_id: task.unique_id,
            file_path: task.save_path.clone(),
            post_url: task.post_url,
        })?;
        self.stats.posts_fetched += 1;
        tracing::info!("Successfully fetched and saved: {}", task.save_path.display());

        Ok(())
    }

    /// Records `page` as the last completed page of `category`
    ///
    /// Read-modify-write over the whole progress state; the cursor never
    /// moves backwards.
    fn advance_progress(&mut self, category: Category, page: u32) -> Result<(), HarvestError> {
        let mut state = self.progress.load()?;
        match state.advance(category, page) {
            Advance::Moved { .. } => {
                self.progress.save(&state)?;
                tracing::info!("Updated progress for {} to page {}", category, page);
            }
            Advance::Unchanged => {}
            Advance::Rejected { current, requested } => {
                tracing::warn!(
                    "Not moving progress for {} back from page {} to {}",
                    category,
                    current,
                    requested
                );
            }
        }
        Ok(())
    }

    /// Sleeps for a random delay inside the configured politeness window
    async fn polite_pause(&self) {
        let delay = sample_delay(self.config.crawl.min_delay_ms, self.config.crawl.max_delay_ms);
        if !delay.is_zero() {
            tracing::debug!("Sleeping for {:.2} seconds", delay.as_secs_f64());
            tokio::time::sleep(delay).await;
        }
    }
}

/// Uniformly samples a delay in `[min_ms, max_ms]`
pub fn sample_delay(min_ms: u64, max_ms: u64) -> Duration {
    if min_ms >= max_ms {
        return Duration::from_millis(min_ms);
    }
    Duration::from_millis(rand::rng().random_range(min_ms..=max_ms))
}

fn log_stop(category: Category, reason: &StopReason) {
    match reason {
        StopReason::NotFound { page } => {
            tracing::info!(
                "No more pages found for category '{}' (page {} returned 404)",
                category,
                page
            );
        }
        StopReason::FetchFailed { page, error } => {
            tracing::error!(
                "Stopping category '{}': page {} could not be fetched: {}",
                category,
                page,
                error
            );
        }
        StopReason::EndOfCategory { page } => {
            tracing::info!(
                "No 'read more' links on page {} of '{}'; assuming end of category",
                page,
                category
            );
        }
        StopReason::NoLinksOnFirstPage => {
            tracing::warn!(
                "No 'read more' links on the first page of '{}'; the category is empty or its layout was not recognised",
                category
            );
        }
    }
}

/// Runs Phase 1 with the configured CSV progress tracker
///
/// # Example
///
/// ```no_run
/// use judgment_harvest::config::Config;
/// use judgment_harvest::crawler::run_crawl;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let stats = run_crawl(Config::default()).await?;
/// println!("{} posts fetched", stats.posts_fetched);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config) -> Result<CrawlStats, HarvestError> {
    let mut coordinator = Coordinator::new(config)?;
    coordinator.run().await
}
