use crate::state::Category;
use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for Judgment-Harvest
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub fetch: FetchConfig,
    pub crawl: CrawlConfig,
    pub storage: StorageConfig,
    pub extraction: ExtractionConfig,
}

/// Source site layout
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Site root under which `category/<slug>/` pages live
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Categories to crawl, in order
    pub categories: Vec<Category>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://itatonline.org/archives".to_string(),
            categories: Category::ALL.to_vec(),
        }
    }
}

/// How the wait between retry attempts grows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackoffPolicy {
    /// `base * 2^(attempt - 1)`
    Exponential,
    /// `base * attempt`
    Linear,
}

/// HTTP fetch behaviour
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Total attempts per URL, including the first one
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    /// Base delay for the backoff policy (milliseconds)
    #[serde(rename = "backoff-base-ms")]
    pub backoff_base_ms: u64,

    #[serde(rename = "backoff-policy")]
    pub backoff_policy: BackoffPolicy,

    /// Pool of client identities; one is picked at random per attempt
    #[serde(rename = "user-agents")]
    pub user_agents: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            request_timeout_secs: 15,
            connect_timeout_secs: 10,
            backoff_base_ms: 1000,
            backoff_policy: BackoffPolicy::Exponential,
            user_agents: vec![
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15".to_string(),
                "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0".to_string(),
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0".to_string(),
            ],
        }
    }
}

/// Phase 1 crawl behaviour
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Maximum number of concurrent post fetches per page
    #[serde(rename = "max-workers")]
    pub max_workers: u32,

    /// Lower bound of the pause between category page fetches (milliseconds)
    #[serde(rename = "min-delay-ms")]
    pub min_delay_ms: u64,

    /// Upper bound of the pause between category page fetches (milliseconds)
    #[serde(rename = "max-delay-ms")]
    pub max_delay_ms: u64,

    /// Re-download posts even when a saved copy exists
    #[serde(rename = "force-refetch")]
    pub force_refetch: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_workers: 5,
            min_delay_ms: 2000,
            max_delay_ms: 8000,
            force_refetch: false,
        }
    }
}

/// Locations of every file the harvester reads or writes
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root of the raw HTML cache
    #[serde(rename = "data-dir")]
    pub data_dir: PathBuf,

    /// Root of the extracted CSV files
    #[serde(rename = "output-dir")]
    pub output_dir: PathBuf,

    #[serde(rename = "ledger-file")]
    pub ledger_file: PathBuf,

    #[serde(rename = "progress-file")]
    pub progress_file: PathBuf,

    #[serde(rename = "log-file")]
    pub log_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("extracted_data"),
            ledger_file: PathBuf::from("ledger.csv"),
            progress_file: PathBuf::from("progress_tracker.csv"),
            log_file: PathBuf::from("project.log"),
        }
    }
}

/// Which summary text wins when both the post and its category page have one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SummaryPolicy {
    /// Whichever candidate is longer
    #[default]
    Longer,
    /// The post's own summary unless it is empty
    DetailFirst,
    /// The category page excerpt unless it is empty
    CategoryFirst,
}

/// Phase 2 extraction behaviour
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Data rows per output file before a new file is started
    #[serde(rename = "max-rows-per-file")]
    pub max_rows_per_file: usize,

    /// Parallel extraction workers; 0 means the available parallelism
    pub workers: usize,

    #[serde(rename = "summary-policy")]
    pub summary_policy: SummaryPolicy,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_rows_per_file: 100,
            workers: 0,
            summary_policy: SummaryPolicy::Longer,
        }
    }
}

impl ExtractionConfig {
    /// Resolves `workers = 0` to the machine's available parallelism
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    }
}
