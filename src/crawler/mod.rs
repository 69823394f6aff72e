//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The collaborator traits the engine drives
//! - The frontier and per-run visited set
//! - Batched, paced, failure-isolated crawling
//! - HTTP fetching
//! - Overall crawl coordination

mod coordinator;
mod engine;
mod fetcher;
mod frontier;
mod traits;

pub use coordinator::{Coordinator, RunSummary, SiteReport};
pub use engine::{CrawlEngine, CrawlReport};
pub use fetcher::{build_http_client, HttpFetcher};
pub use frontier::{Frontier, FrontierEntry, VisitedSet};
pub use traits::{
    FetchOptions, HandlerContext, LinkExtractor, PageContent, PageFetcher, PageHandler,
    ProductSink, UpsertSummary, VisitedLedger,
};

use crate::config::Config;
use crate::Result;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the storage layer and record a new run
/// 2. Build the HTTP client
/// 3. Crawl each configured site in bounded batches
/// 4. Upsert extracted products and update the visited ledger
/// 5. Record the run totals, or mark the run failed, and close storage
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `config_hash` - Hash of the configuration file
/// * `only_site` - Restrict the run to one configured site
///
/// # Returns
///
/// * `Ok(RunSummary)` - Crawl completed
/// * `Err(PartcrawlError)` - Storage could not be opened, the site is
///   unknown, or the run could not be recorded
pub async fn crawl(
    config: Config,
    config_hash: &str,
    only_site: Option<&str>,
) -> Result<RunSummary> {
    let coordinator = Coordinator::new(config, config_hash)?;

    let result = coordinator.run(only_site).await;
    if let Err(e) = &result {
        tracing::error!("Run {} failed: {}", coordinator.run_id(), e);
        if let Err(e) = coordinator.mark_failed() {
            tracing::warn!("Failed to record run failure: {}", e);
        }
    }

    if let Err(e) = coordinator.close() {
        tracing::warn!("Failed to close storage: {}", e);
    }

    result
}
