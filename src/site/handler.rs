//! Selector-driven product extraction
//!
//! A site's `[site.product]` table says which pages carry products and
//! where each field lives. Pages are either single product pages (no
//! `item` selector; the page is the product) or listings where every
//! `item` container holds one product. Listings may name a `detail` set,
//! in which case each item's own product page is fetched through the
//! handler context to fill in what the listing does not show.

use crate::config::{CompatibilitySelectors, SiteConfig};
use crate::crawler::{HandlerContext, PageContent, PageHandler};
use crate::product::{normalize_price, Compatibility, ProductRecord};
use crate::site::FieldSelector;
use crate::url::resolve_link;
use crate::{ConfigError, PartcrawlError, Result};
use async_trait::async_trait;
use scraper::{ElementRef, Html};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
struct CompatibilityFields {
    row: FieldSelector,
    kind: FieldSelector,
    make: FieldSelector,
    model: FieldSelector,
}

/// Selectors applied to an item's own product page
#[derive(Debug, Clone)]
struct DetailFields {
    oem: Option<FieldSelector>,
    oem_strip_prefix: Option<String>,
    availability: Option<FieldSelector>,
    category: Option<FieldSelector>,
    compatible: Option<CompatibilityFields>,
    delay: Duration,
}

impl DetailFields {
    /// Fills the fields the listing left empty
    fn fill(&self, html: &str, record: &mut ProductRecord) {
        let document = Html::parse_document(html);
        let root = document.root_element();

        if record.oem_numbers.is_none() {
            record.oem_numbers = oem_numbers(&self.oem, &self.oem_strip_prefix, root);
        }
        if record.availability.is_none() {
            record.availability = first(&self.availability, root);
        }
        if record.category.is_none() {
            record.category = first(&self.category, root);
        }
        if record.compatible.is_empty() {
            record.compatible = compatibility(&self.compatible, root);
        }
    }
}

/// Page handler built from a site's selector configuration
#[derive(Debug, Clone)]
pub struct SelectorHandler {
    country: Vec<String>,
    markers: Vec<FieldSelector>,
    item: Option<FieldSelector>,
    name: FieldSelector,
    number: Option<FieldSelector>,
    price: Vec<FieldSelector>,
    link: Option<FieldSelector>,
    oem: Option<FieldSelector>,
    oem_strip_prefix: Option<String>,
    availability: Option<FieldSelector>,
    category: Option<FieldSelector>,
    compatible: Option<CompatibilityFields>,
    detail: Option<DetailFields>,
}

impl SelectorHandler {
    pub fn from_config(site: &SiteConfig) -> std::result::Result<Self, ConfigError> {
        let compile = |raw: &str| {
            FieldSelector::parse(raw).map_err(|_| ConfigError::InvalidSelector {
                site: site.name.clone(),
                selector: raw.to_string(),
            })
        };
        let compile_opt = |raw: &Option<String>| raw.as_deref().map(compile).transpose();
        let compile_rows =
            |rows: &Option<CompatibilitySelectors>| -> std::result::Result<_, ConfigError> {
            match rows {
                Some(c) => Ok(Some(CompatibilityFields {
                    row: compile(c.row.as_str())?,
                    kind: compile(c.kind.as_str())?,
                    make: compile(c.make.as_str())?,
                    model: compile(c.model.as_str())?,
                })),
                None => Ok(None),
            }
        };

        let product = &site.product;
        let detail = match &product.detail {
            Some(d) => Some(DetailFields {
                oem: compile_opt(&d.oem)?,
                oem_strip_prefix: d.oem_strip_prefix.clone(),
                availability: compile_opt(&d.availability)?,
                category: compile_opt(&d.category)?,
                compatible: compile_rows(&d.compatible)?,
                delay: d.delay(),
            }),
            None => None,
        };

        Ok(Self {
            country: site.country.clone(),
            markers: product
                .page_markers
                .iter()
                .map(|m| compile(m.as_str()))
                .collect::<std::result::Result<_, _>>()?,
            item: compile_opt(&product.item)?,
            name: compile(product.name.as_str())?,
            number: compile_opt(&product.number)?,
            price: product
                .price
                .iter()
                .map(|p| compile(p.as_str()))
                .collect::<std::result::Result<_, _>>()?,
            link: compile_opt(&product.link)?,
            oem: compile_opt(&product.oem)?,
            oem_strip_prefix: product.oem_strip_prefix.clone(),
            availability: compile_opt(&product.availability)?,
            category: compile_opt(&product.category)?,
            compatible: compile_rows(&product.compatible)?,
            detail,
        })
    }

    /// Every marker must match; without markers a page qualifies when it
    /// has at least one product container (or product name)
    fn is_product_page(&self, html: &str) -> bool {
        let document = Html::parse_document(html);
        let root = document.root_element();

        if !self.markers.is_empty() {
            return self.markers.iter().all(|marker| marker.matches(root));
        }

        match &self.item {
            Some(item) => item.matches(root),
            None => self.name.matches(root),
        }
    }

    fn extract(&self, page: &PageContent, site: &str) -> Result<Vec<ProductRecord>> {
        let base = Url::parse(&page.final_url).map_err(|e| PartcrawlError::Extraction {
            url: page.url.clone(),
            message: format!("bad page URL: {}", e),
        })?;

        let document = Html::parse_document(&page.body);
        let scopes: Vec<ElementRef<'_>> = match &self.item {
            Some(item) => document.select(item.selector()).collect(),
            None => vec![document.root_element()],
        };

        let mut records = Vec::with_capacity(scopes.len());
        for scope in scopes {
            match self.extract_one(scope, page, &base, site) {
                Some(record) => records.push(record),
                None => tracing::debug!("Product without a name on {}", page.url),
            }
        }

        Ok(records)
    }

    fn extract_one(
        &self,
        scope: ElementRef<'_>,
        page: &PageContent,
        base: &Url,
        site: &str,
    ) -> Option<ProductRecord> {
        let name = self.name.first_value(scope)?;

        let link = self
            .link
            .as_ref()
            .and_then(|field| field.first_value(scope))
            .and_then(|href| resolve_link(&href, base))
            .map(String::from)
            .unwrap_or_else(|| page.url.clone());

        let mut record = ProductRecord::new(name, link, site);
        record.number = first(&self.number, scope);
        record.price = self
            .price
            .iter()
            .find_map(|field| field.first_value(scope).and_then(|text| normalize_price(&text)));
        record.oem_numbers = oem_numbers(&self.oem, &self.oem_strip_prefix, scope);
        record.compatible = compatibility(&self.compatible, scope);
        record.availability = first(&self.availability, scope);
        record.category = first(&self.category, scope);
        record.country = self.country.clone();

        Some(record)
    }
}

/// OEM numbers in page order; with a strip prefix only labelled texts count
fn oem_numbers(
    field: &Option<FieldSelector>,
    strip_prefix: &Option<String>,
    scope: ElementRef<'_>,
) -> Option<Vec<String>> {
    let field = field.as_ref()?;

    let numbers: Vec<String> = field
        .values(scope)
        .into_iter()
        .filter_map(|text| match strip_prefix {
            Some(prefix) => text
                .split_once(prefix.as_str())
                .map(|(_, rest)| rest.trim_start_matches([':', ' ']).trim().to_string()),
            None => Some(text),
        })
        .filter(|number| !number.is_empty())
        .collect();

    if numbers.is_empty() {
        None
    } else {
        Some(numbers)
    }
}

fn compatibility(
    fields: &Option<CompatibilityFields>,
    scope: ElementRef<'_>,
) -> Vec<Compatibility> {
    let Some(fields) = fields else {
        return Vec::new();
    };

    scope
        .select(fields.row.selector())
        .filter_map(|row| {
            let kind = fields.kind.first_value(row)?;
            let make = fields.make.first_value(row)?;
            let models: Vec<String> = fields
                .model
                .values(row)
                .iter()
                .flat_map(|text| text.split(','))
                .map(|model| model.trim().to_string())
                .filter(|model| !model.is_empty())
                .collect();

            if models.is_empty() {
                None
            } else {
                Some(Compatibility { kind, make, models })
            }
        })
        .collect()
}

fn first(field: &Option<FieldSelector>, scope: ElementRef<'_>) -> Option<String> {
    field.as_ref().and_then(|f| f.first_value(scope))
}

#[async_trait]
impl PageHandler for SelectorHandler {
    async fn should_handle(&self, page: &PageContent) -> Result<bool> {
        Ok(self.is_product_page(&page.body))
    }

    async fn handle(&self, page: &PageContent, ctx: &HandlerContext) -> Result<Vec<ProductRecord>> {
        let mut records = self.extract(page, &ctx.site)?;

        if let Some(detail) = &self.detail {
            // items without a link of their own have no product page
            for record in records.iter_mut().filter(|r| r.link != page.url) {
                fetch_details(detail, record, ctx).await;
            }
        }

        Ok(records)
    }
}

/// A product page that cannot be fetched leaves the listing data as is
async fn fetch_details(detail: &DetailFields, record: &mut ProductRecord, ctx: &HandlerContext) {
    tokio::time::sleep(detail.delay).await;

    match ctx.fetcher.fetch(&record.link, &ctx.fetch_options).await {
        Ok(product_page) => detail.fill(&product_page.body, record),
        Err(e) => tracing::warn!("No details for {}: {}", record.link, e),
    }
}
