//! Crawler coordinator - main crawl orchestration logic
//!
//! This module wires the configured sites to the crawl engine:
//! - Opening storage and recording the run
//! - Building the HTTP fetcher and per-site profiles
//! - Running the engine site by site
//! - Closing storage whether or not the run succeeded

use crate::config::{Config, SiteConfig};
use crate::crawler::engine::{CrawlEngine, CrawlReport};
use crate::crawler::fetcher::{build_http_client, HttpFetcher};
use crate::crawler::traits::PageFetcher;
use crate::site::{SelectorHandler, SiteLinkExtractor};
use crate::storage::{open_storage, RunTotals, SqliteStorage, Storage, StorageError, StorageSink};
use crate::url::normalize_url;
use crate::{ConfigError, PartcrawlError, Result};
use reqwest::Client;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Report of one site within a run
#[derive(Debug, Clone)]
pub struct SiteReport {
    pub site: String,
    pub report: CrawlReport,
}

/// Outcome of a complete crawl run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: i64,
    pub sites: Vec<SiteReport>,
    pub total: CrawlReport,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Config,
    storage: Arc<Mutex<SqliteStorage>>,
    client: Client,
    run_id: i64,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// Opening the database is the one fatal step: without storage there is
    /// nothing to crawl into.
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `config_hash` - Hash of the configuration file, stored on the run
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(PartcrawlError)` - Failed to initialize
    pub fn new(config: Config, config_hash: &str) -> Result<Self> {
        let storage_path = Path::new(&config.output.database_path);
        let mut storage = open_storage(storage_path)?;

        let run_id = storage.create_run(config_hash)?;
        tracing::info!("Starting run {}", run_id);

        let client = build_http_client(&config.user_agent)?;

        Ok(Self {
            config,
            storage: Arc::new(Mutex::new(storage)),
            client,
            run_id,
        })
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    /// Crawls every configured site, or only `only_site`
    pub async fn run(&self, only_site: Option<&str>) -> Result<RunSummary> {
        let sites = self.select_sites(only_site)?;

        let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new(self.client.clone()));
        let sink = StorageSink::new(Arc::clone(&self.storage), self.config.output.mode);

        let mut summary = RunSummary {
            run_id: self.run_id,
            sites: Vec::with_capacity(sites.len()),
            total: CrawlReport::default(),
        };

        for site in sites {
            let extractor = SiteLinkExtractor::from_config(site)?;
            let handler = SelectorHandler::from_config(site)?;
            let seeds = normalized_seeds(site);

            tracing::info!(
                "Crawling {} from {} seed(s) ({:?} mode)",
                site.name,
                seeds.len(),
                self.config.output.mode
            );

            let mut engine = CrawlEngine::new(
                self.config.crawler.clone(),
                &site.name,
                Arc::clone(&fetcher),
                Arc::new(extractor),
                Arc::new(handler),
                Arc::new(sink.clone()),
            );
            if site.use_visited_ledger {
                engine = engine.with_ledger(Arc::new(sink.clone()));
            }

            let report = engine.run(&seeds).await;
            summary.total += report;
            summary.sites.push(SiteReport {
                site: site.name.clone(),
                report,
            });
        }

        let totals = RunTotals {
            pages_scraped: summary.total.pages_scraped,
            inserted: summary.total.inserted,
            updated: summary.total.updated,
        };
        self.lock()?.complete_run(self.run_id, &totals)?;

        Ok(summary)
    }

    /// Marks the run as failed
    pub fn mark_failed(&self) -> Result<()> {
        self.lock()?.fail_run(self.run_id)?;
        Ok(())
    }

    /// Releases the database connection
    pub fn close(self) -> Result<()> {
        let storage = Arc::try_unwrap(self.storage)
            .map_err(|_| PartcrawlError::Storage("storage is still shared".to_string()))?
            .into_inner()
            .map_err(|_| StorageError::Poisoned)?;
        storage.close()
    }

    fn select_sites(&self, only_site: Option<&str>) -> Result<Vec<&SiteConfig>> {
        let sites: Vec<&SiteConfig> = self
            .config
            .sites
            .iter()
            .filter(|site| only_site.map_or(true, |name| site.name.eq_ignore_ascii_case(name)))
            .collect();

        if let Some(name) = only_site {
            if sites.is_empty() {
                return Err(ConfigError::Validation(format!("No site named '{}'", name)).into());
            }
        }

        Ok(sites)
    }

    fn lock(&self) -> std::result::Result<MutexGuard<'_, SqliteStorage>, StorageError> {
        self.storage.lock().map_err(|_| StorageError::Poisoned)
    }
}

/// Normalized seed URLs of a site; unusable seeds are logged and skipped
fn normalized_seeds(site: &SiteConfig) -> Vec<String> {
    site.seeds
        .iter()
        .filter_map(|seed| match normalize_url(seed) {
            Ok(url) => Some(url.to_string()),
            Err(e) => {
                tracing::warn!("Skipping seed {} of {}: {}", seed, site.name, e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        CrawlerConfig, LinkRules, OutputConfig, PersistMode, ProductSelectors, UserAgentConfig,
    };
    use crate::storage::RunStatus;

    fn test_config(database_path: &str) -> Config {
        Config {
            crawler: CrawlerConfig::default(),
            user_agent: UserAgentConfig {
                crawler_name: "partcrawl".to_string(),
                crawler_version: "0.3".to_string(),
                contact_url: "https://example.fi/bot".to_string(),
                contact_email: "bot@example.fi".to_string(),
            },
            output: OutputConfig {
                database_path: database_path.to_string(),
                mode: PersistMode::Upsert,
            },
            sites: vec![SiteConfig {
                name: "IKH".to_string(),
                seeds: vec![
                    "https://www.ikh.fi/fi/varaosat#top".to_string(),
                    "not a url".to_string(),
                ],
                country: vec!["FIN".to_string()],
                use_visited_ledger: false,
                links: LinkRules::default(),
                product: ProductSelectors {
                    page_markers: vec![],
                    item: None,
                    name: "h1".to_string(),
                    number: None,
                    price: vec![],
                    link: None,
                    oem: None,
                    oem_strip_prefix: None,
                    availability: None,
                    category: None,
                    compatible: None,
                    detail: None,
                },
            }],
        }
    }

    #[test]
    fn test_normalized_seeds_skip_invalid() {
        let config = test_config("unused.db");
        let seeds = normalized_seeds(&config.sites[0]);
        assert_eq!(seeds, vec!["https://www.ikh.fi/fi/varaosat".to_string()]);
    }

    #[test]
    fn test_new_fails_when_storage_unreachable() {
        let config = test_config("/nonexistent-dir/deeper/parts.db");
        assert!(Coordinator::new(config, "hash").is_err());
    }

    #[tokio::test]
    async fn test_unknown_site_fails_run_and_closes_storage() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("parts.db");
        let config = test_config(db.to_str().unwrap());

        let result = crate::crawler::crawl(config, "hash", Some("Hankkija")).await;
        assert!(matches!(result, Err(PartcrawlError::Config(_))));

        let storage = SqliteStorage::new(&db).unwrap();
        let run = storage.get_latest_run().unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.config_hash, "hash");
    }

    #[test]
    fn test_select_sites_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("parts.db");
        let coordinator = Coordinator::new(test_config(db.to_str().unwrap()), "hash").unwrap();

        assert_eq!(coordinator.select_sites(Some("ikh")).unwrap().len(), 1);
        assert_eq!(coordinator.select_sites(None).unwrap().len(), 1);
        assert!(coordinator.select_sites(Some("Stokker")).is_err());
        coordinator.close().unwrap();
    }
}
