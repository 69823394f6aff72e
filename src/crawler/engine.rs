//! Batched crawl engine
//!
//! The engine owns the frontier and the visited set. It takes bounded
//! batches from the frontier, runs every entry of a batch as its own task,
//! waits for all of them to settle, merges the discovered links one level
//! deeper, hands the batch's records to the sink and pauses before the next
//! batch. Per-page failures never leave their task and sink failures never
//! end the run.

use crate::config::CrawlerConfig;
use crate::crawler::frontier::{Frontier, FrontierEntry, VisitedSet};
use crate::crawler::traits::{
    FetchOptions, HandlerContext, LinkExtractor, PageFetcher, PageHandler, ProductSink,
    UpsertSummary, VisitedLedger,
};
use crate::product::ProductRecord;
use crate::Result;
use std::ops::AddAssign;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Totals of one crawl run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Pages taken from the frontier and processed, failures included
    pub pages_scraped: u64,
    /// Pages the visited ledger had for today; fetched for their links only
    pub pages_skipped: u64,
    /// Pages whose fetch, handling or link extraction failed
    pub pages_failed: u64,
    /// Frontier entries dropped as already visited or too deep
    pub pruned: u64,
    pub batches: u64,
    pub records_extracted: u64,
    pub inserted: u64,
    pub updated: u64,
    /// Batches whose records could not be persisted
    pub sink_failures: u64,
}

impl AddAssign for CrawlReport {
    fn add_assign(&mut self, other: Self) {
        self.pages_scraped += other.pages_scraped;
        self.pages_skipped += other.pages_skipped;
        self.pages_failed += other.pages_failed;
        self.pruned += other.pruned;
        self.batches += other.batches;
        self.records_extracted += other.records_extracted;
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.sink_failures += other.sink_failures;
    }
}

#[derive(Debug)]
enum PageStatus {
    Skipped,
    Failed,
    Done { handled: bool },
}

/// What one task contributes back to the engine
#[derive(Debug)]
struct PageOutcome {
    entry: FrontierEntry,
    status: PageStatus,
    links: Vec<String>,
    records: Vec<ProductRecord>,
}

impl PageOutcome {
    fn empty(entry: FrontierEntry, status: PageStatus) -> Self {
        Self {
            entry,
            status,
            links: Vec::new(),
            records: Vec::new(),
        }
    }
}

struct Scraped {
    links: Vec<String>,
    records: Vec<ProductRecord>,
    handled: bool,
}

/// Per-page pipeline, cloned into every task of a batch
#[derive(Clone)]
struct PageWorker {
    site: String,
    fetch_options: FetchOptions,
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn LinkExtractor>,
    handler: Arc<dyn PageHandler>,
    ledger: Option<Arc<dyn VisitedLedger>>,
}

impl PageWorker {
    async fn process(self, entry: FrontierEntry) -> PageOutcome {
        let handled_today = self.handled_today(&entry.url).await;
        if handled_today {
            tracing::debug!("{} already handled today; following links only", entry.url);
        } else {
            tracing::info!("Scraping: {} (depth: {})", entry.url, entry.depth);
        }

        match self.scrape(&entry, !handled_today).await {
            Ok(scraped) => PageOutcome {
                entry,
                status: if handled_today {
                    PageStatus::Skipped
                } else {
                    PageStatus::Done {
                        handled: scraped.handled,
                    }
                },
                links: scraped.links,
                records: scraped.records,
            },
            Err(e) => {
                tracing::warn!("Failed to process {}: {}", entry.url, e);
                PageOutcome::empty(entry, PageStatus::Failed)
            }
        }
    }

    /// A failed lookup counts as not handled
    async fn handled_today(&self, url: &str) -> bool {
        let Some(ledger) = &self.ledger else {
            return false;
        };
        match ledger.is_visited_today(url).await {
            Ok(visited) => visited,
            Err(e) => {
                tracing::warn!("Visited ledger lookup failed for {}: {}", url, e);
                false
            }
        }
    }

    async fn scrape(&self, entry: &FrontierEntry, handle: bool) -> Result<Scraped> {
        let page = self.fetcher.fetch(&entry.url, &self.fetch_options).await?;

        let mut handled = false;
        let mut records = Vec::new();
        if handle && self.handler.should_handle(&page).await? {
            let ctx = HandlerContext {
                site: self.site.clone(),
                fetcher: Arc::clone(&self.fetcher),
                fetch_options: self.fetch_options,
            };
            records = self.handler.handle(&page, &ctx).await?;
            handled = true;
            tracing::debug!("Extracted {} products from {}", records.len(), entry.url);
        }

        let links = self.extractor.extract_links(&page)?;

        Ok(Scraped {
            links,
            records,
            handled,
        })
    }
}

/// Drives one site's collaborators over a link graph
pub struct CrawlEngine {
    config: CrawlerConfig,
    worker: PageWorker,
    sink: Arc<dyn ProductSink>,
}

impl CrawlEngine {
    pub fn new(
        config: CrawlerConfig,
        site: impl Into<String>,
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn LinkExtractor>,
        handler: Arc<dyn PageHandler>,
        sink: Arc<dyn ProductSink>,
    ) -> Self {
        let fetch_options = FetchOptions {
            timeout: config.fetch_timeout(),
            wait: config.wait_strategy,
        };

        Self {
            worker: PageWorker {
                site: site.into(),
                fetch_options,
                fetcher,
                extractor,
                handler,
                ledger: None,
            },
            config,
            sink,
        }
    }

    /// Follows pages the ledger already has for today without handling them
    /// again, and records newly handled ones
    pub fn with_ledger(mut self, ledger: Arc<dyn VisitedLedger>) -> Self {
        self.worker.ledger = Some(ledger);
        self
    }

    /// Crawls from the given seeds until the frontier drains
    ///
    /// Never fails: every per-page and per-batch error is logged and
    /// counted in the report.
    pub async fn run(&self, seeds: &[String]) -> CrawlReport {
        let mut frontier = Frontier::seeded(seeds.iter().cloned());
        let mut visited = VisitedSet::new();
        let mut report = CrawlReport::default();

        loop {
            let (batch, pruned) =
                frontier.take_batch(self.config.batch_size, self.config.max_depth, &mut visited);
            report.pruned += pruned as u64;

            if batch.is_empty() {
                break;
            }

            if report.batches > 0 {
                let delay = self.config.inter_batch_delay();
                tracing::debug!("Waiting {:?} before next batch", delay);
                tokio::time::sleep(delay).await;
            }
            report.batches += 1;

            tracing::info!(
                "[{}] Batch {}: {} pages ({} queued)",
                self.worker.site,
                report.batches,
                batch.len(),
                frontier.len()
            );

            let outcomes = self.run_batch(batch).await;

            let mut records = Vec::new();
            let mut handled_urls = Vec::new();
            for outcome in outcomes {
                let Some(outcome) = outcome else {
                    report.pages_scraped += 1;
                    report.pages_failed += 1;
                    continue;
                };

                match outcome.status {
                    PageStatus::Skipped => report.pages_skipped += 1,
                    PageStatus::Failed => {
                        report.pages_scraped += 1;
                        report.pages_failed += 1;
                    }
                    PageStatus::Done { handled } => {
                        report.pages_scraped += 1;
                        if handled {
                            handled_urls.push(outcome.entry.url.clone());
                        }
                    }
                }

                let next_depth = outcome.entry.depth + 1;
                frontier.add_many(
                    outcome
                        .links
                        .into_iter()
                        .filter(|link| !visited.contains(link))
                        .map(|link| FrontierEntry::new(link, next_depth)),
                );
                records.extend(outcome.records);
            }

            report.records_extracted += records.len() as u64;
            match self.sink.upsert_batch(records).await {
                Ok(summary) => {
                    report.inserted += summary.inserted;
                    report.updated += summary.updated;
                    self.mark_handled(&handled_urls, &summary).await;
                }
                Err(e) => {
                    tracing::error!(
                        "[{}] Failed to persist batch {}: {}",
                        self.worker.site,
                        report.batches,
                        e
                    );
                    report.sink_failures += 1;
                }
            }
        }

        tracing::info!(
            "[{}] Crawl finished: {} pages scraped in {} batches ({} failed, {} skipped)",
            self.worker.site,
            report.pages_scraped,
            report.batches,
            report.pages_failed,
            report.pages_skipped
        );

        report
    }

    /// Runs every entry as its own task and waits for all of them
    ///
    /// A task that panics yields `None`.
    async fn run_batch(&self, batch: Vec<FrontierEntry>) -> Vec<Option<PageOutcome>> {
        let mut tasks = JoinSet::new();
        for entry in batch {
            tasks.spawn(self.worker.clone().process(entry));
        }

        let mut outcomes = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(Some(outcome)),
                Err(e) => {
                    tracing::error!("Page task failed: {}", e);
                    outcomes.push(None);
                }
            }
        }
        outcomes
    }

    async fn mark_handled(&self, urls: &[String], summary: &UpsertSummary) {
        let Some(ledger) = &self.worker.ledger else {
            return;
        };

        tracing::debug!(
            "Batch persisted ({} inserted, {} updated); marking {} pages visited",
            summary.inserted,
            summary.updated,
            urls.len()
        );
        for url in urls {
            if let Err(e) = ledger.mark_visited_today(url).await {
                tracing::warn!("Failed to record {} as visited: {}", url, e);
            }
        }
    }
}
