//! Arbor-Sweep main entry point
//!
//! Command-line interface for the Arbor-Sweep taxonomy scraper.

use anyhow::Context;
use arbor_sweep::config::{load_config_with_hash, Config, PaginationConfig};
use arbor_sweep::crawl::{Coordinator, RunOptions};
use arbor_sweep::driver::{Browser, HttpBrowser};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Arbor-Sweep: a taxonomy-walking site scraper
///
/// Arbor-Sweep walks a site's category tree, resolves paginated item
/// listings, and mirrors extracted records and raw detail-page snapshots
/// onto an output directory tree.
#[derive(Parser, Debug)]
#[command(name = "arbor-sweep")]
#[command(version = "1.0.0")]
#[command(about = "A taxonomy-walking site scraper", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Resume an interrupted crawl (default behavior)
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Start a fresh crawl, ignoring previous checkpoint state
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Override the configured output root directory
    #[arg(long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Only crawl the top-level category with this name
    #[arg(long, value_name = "NAME")]
    category: Option<String>,

    /// Only crawl this archive year
    #[arg(long, value_name = "YEAR")]
    year: Option<u16>,

    /// Validate config and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration; failure here is the one fatal case
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) =
        load_config_with_hash(&cli.config).context("failed to load configuration")?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(output) = &cli.output {
        config.output.root = output.display().to_string();
    }

    if cli.dry_run {
        handle_dry_run(&config, cli.category.as_deref(), cli.year);
        return Ok(());
    }

    let browser: Arc<dyn Browser> = Arc::new(
        HttpBrowser::new(&config.crawler.user_agent).context("failed to start the page driver")?,
    );

    // Ctrl-C stops pulling new nodes and aborts in-flight navigations at
    // their next suspension point.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, finishing the current node and stopping");
                cancel.cancel();
            }
        });
    }

    let options = RunOptions {
        fresh: cli.fresh,
        category_filter: cli.category,
        year_filter: cli.year,
    };

    let coordinator =
        Coordinator::new(config, browser, options, cancel).context("failed to initialize crawl")?;
    let report = coordinator.run().await.context("crawl run failed")?;

    // Failed nodes are logged, not fatal: a finished frontier exits 0.
    println!(
        "Crawl complete: {} completed, {} failed, {} skipped",
        report.completed, report.failed, report.skipped
    );
    println!(
        "Wrote {} records and {} snapshots",
        report.records_written, report.snapshots_written
    );
    if !report.failures.is_empty() {
        println!("Failures:");
        for (id, reason) in report.failures.iter().take(20) {
            println!("  {}: {}", id, reason);
        }
        if report.failures.len() > 20 {
            println!("  … and {} more", report.failures.len() - 20);
        }
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("arbor_sweep=info,warn"),
            1 => EnvFilter::new("arbor_sweep=debug,info"),
            2 => EnvFilter::new("arbor_sweep=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config, category: Option<&str>, year: Option<u16>) {
    println!("=== Arbor-Sweep Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  User agent: {}", config.crawler.user_agent);
    println!(
        "  Navigation timeout: {}ms",
        config.crawler.navigation_timeout_ms
    );
    println!("  Detail workers: {}", config.crawler.detail_workers);
    println!("  Detail delay: {}ms", config.crawler.detail_delay_ms);

    println!("\nRetry Policy:");
    println!("  Max attempts: {}", config.retry.max_attempts);
    println!("  Backoff: {}ms", config.retry.backoff_ms);

    println!("\nOutput root: {}", config.output.root);

    println!("\nSite:");
    println!("  Root URL: {}", config.site.root_url);
    match &config.site.listing.pagination {
        PaginationConfig::Offset {
            param,
            start_offset,
            page_size,
            max_steps,
        } => println!(
            "  Pagination: offset (?{}={}, step {}, max {} pages)",
            param, start_offset, page_size, max_steps
        ),
        PaginationConfig::LoadMore {
            selector,
            max_clicks,
            settle_ms,
        } => println!(
            "  Pagination: load-more (`{}`, max {} clicks, settle {}ms)",
            selector, max_clicks, settle_ms
        ),
    }
    println!(
        "  Listing rules: {} fields (item link from '{}')",
        config.site.listing.rules.len(),
        config.site.listing.item_link_field
    );
    println!("  Detail rules: {} fields", config.site.detail.rules.len());

    if let Some(archive) = &config.site.archive {
        let years = archive.years(year);
        println!(
            "  Archive '{}': {} year(s) starting {}",
            archive.name,
            years.len(),
            archive.start_year
        );
    }

    if let Some(category) = category {
        println!("\nCategory filter: {}", category);
    }

    println!("\n✓ Configuration is valid");
}
