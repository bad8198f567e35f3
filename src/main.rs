//! Rent-Ripple main entry point
//!
//! This is the command-line interface for the Rent-Ripple listing crawler.

use anyhow::Context;
use clap::Parser;
use rent_ripple::config::{load_config_with_hash, Config};
use rent_ripple::crawler::{run_crawl, CrawlOutcome, SentinelFile, StopSignal};
use rent_ripple::output::{load_statistics, print_statistics};
use rent_ripple::state::CrawlTarget;
use rent_ripple::storage::{city_slug, CorpusStore};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Rent-Ripple: a resumable rental-listing crawler
///
/// Rent-Ripple keeps a browser-minted session alive, paces its requests,
/// and crawls the configured cities in turns into a JSON corpus that a later
/// run picks up where the previous one stopped.
#[derive(Parser, Debug)]
#[command(name = "rent-ripple")]
#[command(version = "1.0.0")]
#[command(about = "A resumable rental-listing crawler", long_about = None)]
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

    /// Validate config and show where each city would resume, without network access
    #[arg(long, conflicts_with_all = ["stats", "stop"])]
    dry_run: bool,

    /// Show corpus statistics and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stop"])]
    stats: bool,

    /// Ask a running crawl to stop at its next checkpoint and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    stop: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.stop {
        handle_stop(&config)?;
    } else {
        handle_crawl(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("rent_ripple=info,warn"),
            1 => EnvFilter::new("rent_ripple=debug,info"),
            2 => EnvFilter::new("rent_ripple=trace,debug"),
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

/// Handles the --dry-run mode: shows configuration and resume points
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Rent-Ripple Dry Run ===\n");

    println!("Session:");
    println!("  Cookie file: {}", config.session.cookie_file.display());
    println!("  Refresh command: {}", config.session.refresh_command.join(" "));
    println!("  Refresh timeout: {}s", config.session.refresh_timeout_secs);

    println!("\nClient:");
    println!("  Base URL: {}", config.client.base_url);
    println!(
        "  Pacing: {}-{}ms",
        config.client.min_delay_ms, config.client.max_delay_ms
    );
    println!(
        "  Attempts on 403: {} ({}ms cooldown)",
        config.client.max_retries, config.client.retry_cooldown_ms
    );

    println!("\nCrawl:");
    println!("  Page size: {}", config.crawl.page_size);
    println!("  Flatsharing: {}", config.crawl.include_flatsharing);
    println!("  Stop sentinel: {}", config.crawl.stop_sentinel.display());
    println!("  Data dir: {}", config.output.data_dir.display());

    let corpus = CorpusStore::new(config.output.data_dir.clone());
    println!("\nCities ({}):", config.cities.len());
    for city in &config.cities {
        let slug = city_slug(&city.name);
        match &city.place_id {
            Some(place_id) => {
                let target = CrawlTarget::resume(
                    &corpus.city(&slug),
                    rent_ripple::api::PlaceId::new(place_id.clone()),
                )?;
                println!(
                    "  - {} [{}] -> {}/, next page {}",
                    city.name,
                    place_id,
                    slug,
                    target.next_page()
                );
            }
            None => println!("  - {} (place id resolved at crawl time)", city.name),
        }
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the --stats mode: shows per-city corpus counts
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Data dir: {}\n", config.output.data_dir.display());

    let corpus = CorpusStore::new(config.output.data_dir.clone());
    let stats = load_statistics(&corpus)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --stop mode: raises the stop sentinel
fn handle_stop(config: &Config) -> anyhow::Result<()> {
    let sentinel = SentinelFile::new(config.crawl.stop_sentinel.clone());
    sentinel
        .set()
        .with_context(|| format!("failed to create {}", sentinel.path().display()))?;

    println!(
        "Stop requested ({}); the crawl ends at its next checkpoint",
        sentinel.path().display()
    );
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        "Crawling {} cities into {}",
        config.cities.len(),
        config.output.data_dir.display()
    );

    let report = match run_crawl(config).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e).context("crawl aborted; pages already written are kept for resumption");
        }
    };

    for target in &report.targets {
        tracing::info!(
            "{}: {} (next page {})",
            target.city_slug(),
            target.state(),
            target.next_page()
        );
    }
    tracing::info!(
        "{} rounds, {} pages written, {} listings saved, {} already stored, {} removed",
        report.rounds,
        report.pages_written,
        report.listings_saved,
        report.listings_already_stored,
        report.listings_removed
    );

    if report.outcome == CrawlOutcome::Stopped {
        tracing::info!("Stopped on request; rerun to resume");
    }

    Ok(())
}
