//! Link extraction for configured shops
//!
//! Collects `<a href>` targets from a page, resolves them against the
//! page's final URL and keeps only the ones the site's link rules allow:
//! - the host of the site's first seed (unless `same-host = false`)
//! - one of the include path prefixes, when any are configured
//! - none of the exclude substrings

use crate::config::{LinkRules, SiteConfig};
use crate::crawler::{LinkExtractor, PageContent};
use crate::url::{normalize_url, resolve_link, same_host};
use crate::{Result, UrlError, UrlResult};
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Link extractor driven by a site's `[site.links]` rules
#[derive(Debug, Clone)]
pub struct SiteLinkExtractor {
    home: Option<Url>,
    rules: LinkRules,
}

impl SiteLinkExtractor {
    pub fn from_config(site: &SiteConfig) -> UrlResult<Self> {
        let home = if site.links.same_host {
            let first = site
                .seeds
                .first()
                .ok_or_else(|| UrlError::Parse(format!("site '{}' has no seeds", site.name)))?;
            Some(normalize_url(first)?)
        } else {
            None
        };

        Ok(Self {
            home,
            rules: site.links.clone(),
        })
    }

    fn allows(&self, url: &Url) -> bool {
        if let Some(home) = &self.home {
            if !same_host(url, home) {
                return false;
            }
        }

        if !self.rules.include_prefixes.is_empty()
            && !self
                .rules
                .include_prefixes
                .iter()
                .any(|prefix| url.path().starts_with(prefix.as_str()))
        {
            return false;
        }

        !self
            .rules
            .exclude_substrings
            .iter()
            .any(|needle| url.as_str().contains(needle.as_str()))
    }
}

impl LinkExtractor for SiteLinkExtractor {
    fn extract_links(&self, page: &PageContent) -> Result<Vec<String>> {
        let base = Url::parse(&page.final_url)?;

        let mut seen = HashSet::new();
        let links = collect_links(&page.body, &base)
            .into_iter()
            .filter(|url| self.allows(url))
            .map(String::from)
            .filter(|url| seen.insert(url.clone()))
            .collect();

        Ok(links)
    }
}

/// Resolved targets of every followable anchor, in document order
fn collect_links(html: &str, base_url: &Url) -> Vec<Url> {
    let document = Html::parse_document(html);
    let Ok(a_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&a_selector)
        .filter(|element| element.value().attr("download").is_none())
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .collect()
}
