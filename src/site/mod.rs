//! Configurable shop profiles
//!
//! Each `[[site]]` entry becomes a link extractor and a page handler that
//! the crawl engine drives. Nothing in here knows a particular shop; the
//! selectors and link rules come from configuration.

mod handler;
mod links;
mod selector;

pub use handler::SelectorHandler;
pub use links::SiteLinkExtractor;
pub use selector::FieldSelector;
