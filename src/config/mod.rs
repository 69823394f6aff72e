//! Configuration module for Partcrawl
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use partcrawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("partcrawl.toml")).unwrap();
//! println!("Crawler will use batch size: {}", config.crawler.batch_size);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CompatibilitySelectors, Config, CrawlerConfig, DetailSelectors, LinkRules, OutputConfig,
    PersistMode, ProductSelectors, SiteConfig, UserAgentConfig, WaitStrategy,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
