//! URL handling module for Partcrawl
//!
//! This module provides URL normalization, used as the deduplication key
//! for the visited set, and resolution of `href` values found on pages.

mod normalize;

pub use normalize::{normalize_url, resolve_link};

use url::Url;

/// Returns true if both URLs point at the same host (and port)
///
/// # Examples
///
/// ```
/// use url::Url;
/// use partcrawl::url::same_host;
///
/// let a = Url::parse("https://shop.example.fi/a").unwrap();
/// let b = Url::parse("https://shop.example.fi/b?p=2").unwrap();
/// let c = Url::parse("https://other.example.fi/a").unwrap();
/// assert!(same_host(&a, &b));
/// assert!(!same_host(&a, &c));
/// ```
pub fn same_host(a: &Url, b: &Url) -> bool {
    a.host_str() == b.host_str() && a.port_or_known_default() == b.port_or_known_default()
}
