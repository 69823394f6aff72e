//! CSS selectors with an optional attribute suffix
//!
//! `h1.product-name` reads element text; `button.add-to-cart[data-hn]@data-hn`
//! reads the `data-hn` attribute of the matched elements instead.

use crate::product::clean_text;
use scraper::{ElementRef, Selector};

/// A compiled selector plus where to read the value from
#[derive(Debug, Clone)]
pub struct FieldSelector {
    selector: Selector,
    attribute: Option<String>,
}

impl FieldSelector {
    /// Parses `css` or `css@attribute`
    ///
    /// # Examples
    ///
    /// ```
    /// use partcrawl::site::FieldSelector;
    ///
    /// assert!(FieldSelector::parse("meta[property='og:title']@content").is_ok());
    /// assert!(FieldSelector::parse("div[[").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self, String> {
        let (css, attribute) = split_attribute(raw.trim());
        if css.is_empty() {
            return Err(format!("empty selector '{}'", raw));
        }

        let selector = Selector::parse(css).map_err(|e| format!("{}: {:?}", css, e))?;

        Ok(Self {
            selector,
            attribute: attribute.map(str::to_string),
        })
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Whether anything under `scope` matches
    pub fn matches(&self, scope: ElementRef<'_>) -> bool {
        scope.select(&self.selector).next().is_some()
    }

    /// Every non-empty value under `scope`, in document order
    pub fn values(&self, scope: ElementRef<'_>) -> Vec<String> {
        scope
            .select(&self.selector)
            .filter_map(|element| self.read(element))
            .collect()
    }

    /// First non-empty value under `scope`
    pub fn first_value(&self, scope: ElementRef<'_>) -> Option<String> {
        scope
            .select(&self.selector)
            .find_map(|element| self.read(element))
    }

    fn read(&self, element: ElementRef<'_>) -> Option<String> {
        match &self.attribute {
            Some(name) => element.value().attr(name).and_then(clean_text),
            None => clean_text(&element.text().collect::<String>()),
        }
    }
}

/// Splits a trailing `@attribute`, leaving `@` inside brackets or quotes alone
fn split_attribute(raw: &str) -> (&str, Option<&str>) {
    if let Some((css, attribute)) = raw.rsplit_once('@') {
        let is_name = !attribute.is_empty()
            && attribute
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ':');
        if is_name && !css.ends_with('\\') {
            return (css.trim_end(), Some(attribute));
        }
    }
    (raw, None)
}
