//! Listing-Harvest main entry point
//!
//! This is the command-line interface for the Listing-Harvest crawler.

use anyhow::Context;
use clap::Parser;
use listing_harvest::config::{load_config_with_hash, validate, Config};
use listing_harvest::crawler::{crawl, page_url};
use listing_harvest::output::{print_report, status_counts, write_dataset};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Listing-Harvest: a resilient multi-region listing crawler
///
/// Listing-Harvest walks every listing page of the configured regions,
/// decodes each listing into a record, and writes all records to one
/// spreadsheet. Regions are crawled in parallel under a fixed limit; failing
/// pages are retried with backoff and failing regions never stop the run.
#[derive(Parser, Debug)]
#[command(name = "listing-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A resilient multi-region listing crawler", long_about = None)]
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

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Write the dataset here instead of the configured output path
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Crawl these regions instead of the configured list (repeatable)
    #[arg(short, long = "region", value_name = "KEY")]
    regions: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if apply_overrides(&mut config, &cli) {
        validate(&config).context("invalid command-line override")?;
    }

    if cli.dry_run {
        handle_dry_run(&config)
    } else {
        handle_crawl(config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("listing_harvest=info,warn"),
            1 => EnvFilter::new("listing_harvest=debug,info"),
            2 => EnvFilter::new("listing_harvest=trace,debug"),
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

/// Applies `--region` and `--output`; returns true if anything changed
fn apply_overrides(config: &mut Config, cli: &Cli) -> bool {
    let mut changed = false;

    if !cli.regions.is_empty() {
        tracing::info!("Region list overridden: {}", cli.regions.join(", "));
        config.regions = cli.regions.clone();
        changed = true;
    }

    if let Some(output) = &cli.output {
        config.output.path = output.display().to_string();
        changed = true;
    }

    changed
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Listing-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Base URL: {}", config.crawler.base_url);
    println!(
        "  Listing: {} (/{}/)",
        config.crawler.listing.as_str(),
        config.crawler.listing.path_segment()
    );
    println!(
        "  Max concurrent regions: {}",
        config.crawler.max_concurrent_regions
    );
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!("  Max attempts per page: {}", config.crawler.max_attempts);
    println!(
        "  Request delay: {}-{}ms",
        config.crawler.request_delay.min_ms, config.crawler.request_delay.max_ms
    );
    println!(
        "  Page delay: {}-{}ms",
        config.crawler.page_delay.min_ms, config.crawler.page_delay.max_ms
    );
    println!(
        "  Retry backoff: {}-{}ms",
        config.crawler.retry_backoff.min_ms, config.crawler.retry_backoff.max_ms
    );

    println!("\nSession:");
    println!("  Cookies: {}", config.session.cookies.len());
    println!(
        "  Source id: {}",
        if config.session.source_id.is_some() {
            "set"
        } else {
            "not set"
        }
    );

    println!("\nOutput:");
    println!("  Dataset: {}", config.output.path);

    println!("\nRegions ({}):", config.regions.len());
    for region in &config.regions {
        let url = page_url(&config.crawler, region, 1)?;
        println!("  - {} -> {}", region, url);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would crawl {} regions, up to {} at a time",
        config.regions.len(),
        config.crawler.max_concurrent_regions
    );

    Ok(())
}

/// What a Ctrl-C does to the running crawl
#[derive(Debug, PartialEq, Eq)]
enum Interrupt {
    /// First signal: cancel and let running regions wind down
    Drain,
    /// Signal after cancellation: stop the process now
    ForceExit,
}

fn on_interrupt(cancel: &CancellationToken) -> Interrupt {
    if cancel.is_cancelled() {
        Interrupt::ForceExit
    } else {
        cancel.cancel();
        Interrupt::Drain
    }
}

/// Handles the main crawl operation
///
/// Region failures are reported but do not fail the process; only a dataset
/// that cannot be written does.
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        "Crawling {} regions of {} ({} listings)",
        config.regions.len(),
        config.crawler.base_url,
        config.crawler.listing.as_str()
    );

    let output_path = PathBuf::from(&config.output.path);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            match on_interrupt(&trigger) {
                Interrupt::Drain => tracing::warn!(
                    "Interrupt received, finishing pages in flight (press Ctrl-C again to force exit)"
                ),
                Interrupt::ForceExit => {
                    tracing::error!("Second interrupt received, exiting immediately");
                    std::process::exit(130);
                }
            }
        }
    });

    let output = crawl(config, &cancel).await.context("crawl could not start")?;

    print_report(&output.report);
    for (status, count) in status_counts(&output.report) {
        tracing::info!("{} regions: {}", status, count);
    }

    if output.dataset.is_empty() {
        tracing::warn!("No records collected, nothing written");
        return Ok(());
    }

    let written = write_dataset(&output.dataset, Path::new(&output_path))
        .context("failed to write dataset")?;
    println!(
        "\n✓ {} records written to {}",
        output.dataset.len(),
        written.display()
    );

    Ok(())
}
