//! Judgment-Harvest main entry point
//!
//! This is the command-line interface for the two-phase judgment crawler.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use judgment_harvest::config::{load_or_default, Config};
use judgment_harvest::crawler::run_crawl;
use judgment_harvest::output::{print_crawl_stats, print_extraction_stats, scan_category_dir};
use judgment_harvest::pipeline::run_extraction;
use judgment_harvest::storage::{load_entries, CsvProgressStore, Ledger, ProgressStore, RepairOutcome};
use judgment_harvest::url::category_page_url;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Which half of the pipeline to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Phase {
    /// Crawl category pages and save every post
    #[value(name = "1")]
    Crawl,
    /// Extract structured fields from saved posts
    #[value(name = "2")]
    Extract,
}

/// Judgment-Harvest: a resumable judgment crawler
///
/// Phase 1 walks every category of the site and saves each post to a local
/// HTML cache. Phase 2 turns the saved posts into CSV files of case fields.
/// Both phases resume where an interrupted run stopped.
#[derive(Parser, Debug)]
#[command(name = "judgment-harvest")]
#[command(version)]
#[command(about = "A resumable two-phase judgment crawler", long_about = None)]
struct Cli {
    /// Phase to run: 1 = crawl, 2 = extract
    #[arg(value_enum, value_name = "PHASE", required_unless_present = "stats")]
    phase: Option<Phase>,

    /// Path to TOML configuration file (built-in defaults if omitted)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Download posts again even if they are already saved
    #[arg(long)]
    force: bool,

    /// Repair the ledger header before running
    #[arg(long)]
    repair_ledger: bool,

    /// Validate config and show what would be done without doing it
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show the state of the ledger, progress file and outputs, then exit
    #[arg(long)]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_or_default(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("Failed to load configuration from {}", path.display()),
        None => "Invalid built-in configuration".to_string(),
    })?;
    if cli.force {
        config.crawl.force_refetch = true;
    }

    setup_logging(cli.verbose, cli.quiet, &config.storage.log_file);
    match &cli.config {
        Some(path) => tracing::info!("Configuration loaded from: {}", path.display()),
        None => tracing::info!("No configuration file given; using defaults"),
    }

    if cli.stats {
        return handle_stats(&config);
    }

    let Some(phase) = cli.phase else {
        anyhow::bail!("A phase (1 or 2) is required");
    };

    if cli.dry_run {
        handle_dry_run(&config, phase);
        return Ok(());
    }

    if cli.repair_ledger {
        handle_repair(&config.storage.ledger_file)?;
    }

    match phase {
        Phase::Crawl => handle_crawl(config).await,
        Phase::Extract => handle_extract(config).await,
    }
}

/// Sets up console and log file output based on verbosity level
///
/// The log file receives the same events as the console, without colours.
/// If it cannot be opened, logging continues on the console only.
fn setup_logging(verbose: u8, quiet: bool, log_file: &Path) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("judgment_harvest=info,warn"),
            1 => EnvFilter::new("judgment_harvest=debug,info"),
            2 => EnvFilter::new("judgment_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false);

    let file = match OpenOptions::new().create(true).append(true).open(log_file) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("Cannot open log file {}: {}", log_file.display(), e);
            None
        }
    };
    let file_layer = file.map(|file| {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_writer(Mutex::new(file))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config, phase: Phase) {
    println!("=== Judgment-Harvest Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  Categories ({}):", config.site.categories.len());
    for category in &config.site.categories {
        println!(
            "    - {} ({})",
            category,
            category_page_url(&config.site.base_url, *category, 1)
        );
    }

    println!("\nFetching:");
    println!("  Max attempts: {}", config.fetch.max_retries);
    println!("  Request timeout: {}s", config.fetch.request_timeout_secs);
    println!(
        "  Backoff: {:?} from {}ms",
        config.fetch.backoff_policy, config.fetch.backoff_base_ms
    );
    println!("  User agents: {}", config.fetch.user_agents.len());

    println!("\nCrawl:");
    println!("  Max workers: {}", config.crawl.max_workers);
    println!(
        "  Delay between pages: {}-{}ms",
        config.crawl.min_delay_ms, config.crawl.max_delay_ms
    );
    println!("  Force refetch: {}", config.crawl.force_refetch);

    println!("\nStorage:");
    println!("  HTML cache: {}", config.storage.data_dir.display());
    println!("  Output: {}", config.storage.output_dir.display());
    println!("  Ledger: {}", config.storage.ledger_file.display());
    println!("  Progress: {}", config.storage.progress_file.display());
    println!("  Log: {}", config.storage.log_file.display());

    println!("\nExtraction:");
    println!("  Rows per file: {}", config.extraction.max_rows_per_file);
    println!("  Workers: {}", config.extraction.effective_workers());
    println!("  Summary policy: {:?}", config.extraction.summary_policy);

    println!("\n✓ Configuration is valid");
    match phase {
        Phase::Crawl => println!(
            "✓ Would crawl {} categories",
            config.site.categories.len()
        ),
        Phase::Extract => println!(
            "✓ Would extract from {}",
            config.storage.ledger_file.display()
        ),
    }
}

/// Handles the --stats mode: summarises the files both phases leave behind
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let entries = load_entries(&config.storage.ledger_file)
        .with_context(|| format!("Failed to read {}", config.storage.ledger_file.display()))?;
    let progress = CsvProgressStore::new(config.storage.progress_file.clone())
        .load()
        .with_context(|| format!("Failed to read {}", config.storage.progress_file.display()))?;

    println!("=== Judgment-Harvest State ===\n");
    println!("Ledger: {} posts saved", entries.len());

    println!("\nProgress:");
    for category in &config.site.categories {
        let out_dir = config.storage.output_dir.join(category.slug());
        let extracted = match scan_category_dir(&out_dir) {
            Ok(scan) => scan.seen.len().to_string(),
            Err(e) => {
                tracing::error!("Failed to scan {}: {}", out_dir.display(), e);
                "?".to_string()
            }
        };
        match progress.last_page(*category) {
            Some(page) => println!(
                "  {}: last page {}, {} extracted",
                category, page, extracted
            ),
            None => println!("  {}: not started, {} extracted", category, extracted),
        }
    }

    Ok(())
}

/// Handles --repair-ledger
fn handle_repair(ledger_file: &Path) -> anyhow::Result<()> {
    let outcome = Ledger::repair(ledger_file)
        .with_context(|| format!("Failed to repair {}", ledger_file.display()))?;
    match outcome {
        RepairOutcome::Created => tracing::info!("Created empty ledger {}", ledger_file.display()),
        RepairOutcome::AlreadyValid => tracing::info!("Ledger header is valid"),
        RepairOutcome::HeaderInserted { kept_first_row } => tracing::warn!(
            "Inserted missing ledger header (first line {})",
            if kept_first_row { "kept as data" } else { "dropped" }
        ),
    }
    Ok(())
}

/// Handles Phase 1
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        "Starting crawl of {} categories from {}",
        config.site.categories.len(),
        config.site.base_url
    );

    match run_crawl(config).await {
        Ok(stats) => {
            tracing::info!("Crawl completed successfully");
            print_crawl_stats(&stats);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

/// Handles Phase 2
async fn handle_extract(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        "Starting extraction from {} into {}",
        config.storage.ledger_file.display(),
        config.storage.output_dir.display()
    );

    match run_extraction(config).await {
        Ok(stats) => {
            tracing::info!("Extraction completed successfully");
            print_extraction_stats(&stats);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Extraction failed: {}", e);
            Err(e.into())
        }
    }
}
