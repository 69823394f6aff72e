//! Collaborator interfaces driven by the crawl engine
//!
//! The engine only sees these traits. The HTTP fetcher, the configurable
//! site profiles and the SQLite sink are one set of implementations; tests
//! plug in in-memory ones.

use crate::config::WaitStrategy;
use crate::product::ProductRecord;
use crate::Result;
use async_trait::async_trait;
use std::ops::AddAssign;
use std::sync::Arc;
use std::time::Duration;

/// Per-request fetch settings
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub wait: WaitStrategy,
}

/// A fetched page
#[derive(Debug, Clone)]
pub struct PageContent {
    /// URL that was requested
    pub url: String,
    /// URL after redirects; relative links resolve against this
    pub final_url: String,
    pub status: u16,
    pub body: String,
}

/// What a page handler gets besides the page itself
#[derive(Clone)]
pub struct HandlerContext {
    pub site: String,
    /// Lets handlers fetch secondary resources with the same settings
    pub fetcher: Arc<dyn PageFetcher>,
    pub fetch_options: FetchOptions,
}

/// Counts reported by a sink for one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertSummary {
    pub inserted: u64,
    pub updated: u64,
}

impl AddAssign for UpsertSummary {
    fn add_assign(&mut self, other: Self) {
        self.inserted += other.inserted;
        self.updated += other.updated;
    }
}

/// Retrieves page content
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<PageContent>;
}

/// Finds candidate links to follow on a page
pub trait LinkExtractor: Send + Sync {
    fn extract_links(&self, page: &PageContent) -> Result<Vec<String>>;
}

/// Decides whether a page carries products and extracts them
#[async_trait]
pub trait PageHandler: Send + Sync {
    async fn should_handle(&self, page: &PageContent) -> Result<bool>;

    async fn handle(&self, page: &PageContent, ctx: &HandlerContext)
        -> Result<Vec<ProductRecord>>;
}

/// Persists extracted products
///
/// Must be idempotent per `(site, name, number)` and accept empty batches.
#[async_trait]
pub trait ProductSink: Send + Sync {
    async fn upsert_batch(&self, records: Vec<ProductRecord>) -> Result<UpsertSummary>;
}

/// Day-scoped record of processed URLs for resuming within a day
#[async_trait]
pub trait VisitedLedger: Send + Sync {
    async fn is_visited_today(&self, url: &str) -> Result<bool>;

    async fn mark_visited_today(&self, url: &str) -> Result<()>;
}
