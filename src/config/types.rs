use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Partcrawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default, rename = "site")]
    pub sites: Vec<SiteConfig>,
}

/// Crawl engine behavior, shared by every site
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Deepest link depth still fetched (seeds are depth 0)
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Number of pages fetched concurrently per batch
    #[serde(rename = "batch-size")]
    pub batch_size: usize,

    /// Pause between two batches (milliseconds)
    #[serde(rename = "inter-batch-delay")]
    pub inter_batch_delay: u64,

    /// Timeout of a single page fetch (seconds)
    #[serde(rename = "fetch-timeout")]
    pub fetch_timeout: u64,

    /// When a rendering fetcher considers a page loaded
    #[serde(rename = "wait-strategy")]
    pub wait_strategy: WaitStrategy,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 5,
            batch_size: 5,
            inter_batch_delay: 1000,
            fetch_timeout: 60,
            wait_strategy: WaitStrategy::NetworkIdle,
        }
    }
}

impl CrawlerConfig {
    pub fn inter_batch_delay(&self) -> Duration {
        Duration::from_millis(self.inter_batch_delay)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout)
    }
}

/// Page readiness condition for fetchers that render pages
///
/// Static HTTP fetchers treat the response body as loaded and ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WaitStrategy {
    /// The load event fired
    Load,
    /// No network activity for a short while
    NetworkIdle,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Format: CrawlerName/Version (+ContactURL; ContactEmail)
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// How extracted products are written
    #[serde(default)]
    pub mode: PersistMode,
}

/// Persistence mode for extracted products
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PersistMode {
    /// Insert new products, update mutable fields of known ones
    #[default]
    Upsert,
    /// Only update price and availability of already known products
    Refresh,
}

/// One shop to crawl
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Site identifier stored on every product, e.g. "Hankkija"
    pub name: String,

    /// Start URLs, crawled at depth 0
    pub seeds: Vec<String>,

    /// Country tags stored on every product, e.g. ["FIN"]
    #[serde(default)]
    pub country: Vec<String>,

    /// Skip product pages already handled today
    #[serde(default, rename = "use-visited-ledger")]
    pub use_visited_ledger: bool,

    #[serde(default)]
    pub links: LinkRules,

    pub product: ProductSelectors,
}

/// Which discovered links are followed
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LinkRules {
    /// Only follow links on the host of the first seed
    #[serde(rename = "same-host")]
    pub same_host: bool,

    /// Path prefixes a link must start with (empty = any path)
    #[serde(rename = "include-prefixes")]
    pub include_prefixes: Vec<String>,

    /// Substrings that exclude a link when found anywhere in it
    #[serde(rename = "exclude-substrings")]
    pub exclude_substrings: Vec<String>,
}

impl Default for LinkRules {
    fn default() -> Self {
        Self {
            same_host: true,
            include_prefixes: Vec::new(),
            exclude_substrings: Vec::new(),
        }
    }
}

/// CSS selectors describing where product data lives on a page
///
/// Every selector accepts an optional `@attribute` suffix, in which case
/// the attribute value is read instead of the element text
/// (`button.add-to-cart[data-hn]@data-hn`).
#[derive(Debug, Clone, Deserialize)]
pub struct ProductSelectors {
    /// Selectors that must all match for a page to be handled
    #[serde(default, rename = "page-markers")]
    pub page_markers: Vec<String>,

    /// Container of one product on listing pages; absent = one product per page
    #[serde(default)]
    pub item: Option<String>,

    pub name: String,

    #[serde(default)]
    pub number: Option<String>,

    /// Tried in order, first usable price wins
    #[serde(default)]
    pub price: Vec<String>,

    /// Product link inside an item; absent = the page URL
    #[serde(default)]
    pub link: Option<String>,

    #[serde(default)]
    pub oem: Option<String>,

    /// Label removed from OEM texts, e.g. "OEM-numero"
    #[serde(default, rename = "oem-strip-prefix")]
    pub oem_strip_prefix: Option<String>,

    #[serde(default)]
    pub availability: Option<String>,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub compatible: Option<CompatibilitySelectors>,

    /// Product page of each listing item, fetched for fields the item lacks
    #[serde(default)]
    pub detail: Option<DetailSelectors>,
}

/// Fields read from an item's own product page
///
/// Only used together with `item`. A value found on the listing is kept;
/// the product page fills in what the listing does not show.
#[derive(Debug, Clone, Deserialize)]
pub struct DetailSelectors {
    #[serde(default)]
    pub oem: Option<String>,

    #[serde(default, rename = "oem-strip-prefix")]
    pub oem_strip_prefix: Option<String>,

    #[serde(default)]
    pub availability: Option<String>,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub compatible: Option<CompatibilitySelectors>,

    /// Pause before each product page fetch (milliseconds)
    #[serde(default = "default_detail_delay")]
    pub delay: u64,
}

fn default_detail_delay() -> u64 {
    50
}

impl DetailSelectors {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay)
    }
}

/// Selectors for compatibility table rows
#[derive(Debug, Clone, Deserialize)]
pub struct CompatibilitySelectors {
    pub row: String,
    pub kind: String,
    pub make: String,
    pub model: String,
}
