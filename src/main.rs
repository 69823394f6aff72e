//! Partcrawl main entry point
//!
//! This is the command-line interface for the Partcrawl tractor-parts crawler.

use anyhow::Context;
use clap::Parser;
use partcrawl::config::{load_config_with_hash, Config};
use partcrawl::crawler::crawl;
use partcrawl::output::{
    load_statistics, print_run_summary, print_search_results, print_statistics, SEARCH_LIMIT,
};
use partcrawl::storage::{SqliteStorage, Storage};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Partcrawl: a polite crawler for tractor-parts shops
///
/// Partcrawl walks the configured shops in small paced batches, extracts
/// product listings with CSS selectors and keeps one record per product
/// and shop in a SQLite database.
#[derive(Parser, Debug)]
#[command(name = "partcrawl")]
#[command(version)]
#[command(about = "A polite crawler for tractor-parts shops", long_about = None)]
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

    /// Crawl only the named site
    #[arg(long, value_name = "NAME", conflicts_with_all = ["stats", "search"])]
    site: Option<String>,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "search"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "search"])]
    stats: bool,

    /// Search stored products by name, number, price, site or OEM number
    #[arg(long, value_name = "QUERY", conflicts_with_all = ["dry_run", "stats"])]
    search: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config, cli.site.as_deref());
    } else if cli.stats {
        handle_stats(&config)?;
    } else if let Some(query) = &cli.search {
        handle_search(&config, query)?;
    } else {
        handle_crawl(config, &config_hash, cli.site.as_deref()).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("partcrawl=info,warn"),
            1 => EnvFilter::new("partcrawl=debug,info"),
            2 => EnvFilter::new("partcrawl=trace,debug"),
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

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config, only_site: Option<&str>) {
    println!("=== Partcrawl Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Batch size: {}", config.crawler.batch_size);
    println!("  Inter-batch delay: {}ms", config.crawler.inter_batch_delay);
    println!("  Fetch timeout: {}s", config.crawler.fetch_timeout);
    println!("  Wait strategy: {:?}", config.crawler.wait_strategy);

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Mode: {:?}", config.output.mode);

    let sites: Vec<_> = config
        .sites
        .iter()
        .filter(|s| only_site.map_or(true, |name| s.name.eq_ignore_ascii_case(name)))
        .collect();

    println!("\nSites ({}):", sites.len());
    for site in &sites {
        println!(
            "  - {} ({} seeds{})",
            site.name,
            site.seeds.len(),
            if site.use_visited_ledger {
                ", visited ledger"
            } else {
                ""
            }
        );
        for seed in &site.seeds {
            println!("    * {}", seed);
        }
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would start crawling with {} seed URLs",
        sites.iter().map(|s| s.seeds.len()).sum::<usize>()
    );
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))
        .context("Failed to open database")?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);
    storage.close()?;

    Ok(())
}

/// Handles the --search mode: prints matching products
fn handle_search(config: &Config, query: &str) -> anyhow::Result<()> {
    let storage = SqliteStorage::new(Path::new(&config.output.database_path))
        .context("Failed to open database")?;
    let products = storage.search_products(query, SEARCH_LIMIT)?;
    print_search_results(query, &products);
    storage.close()?;

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    config_hash: &str,
    only_site: Option<&str>,
) -> anyhow::Result<()> {
    let seed_count: usize = config.sites.iter().map(|s| s.seeds.len()).sum();
    tracing::info!(
        "Sites: {}, total seed URLs: {}",
        config.sites.len(),
        seed_count
    );

    let summary = crawl(config, config_hash, only_site)
        .await
        .context("Crawl failed")?;

    tracing::info!("Crawl completed successfully");
    print_run_summary(&summary);

    Ok(())
}
