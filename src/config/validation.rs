use crate::config::types::{
    CompatibilitySelectors, Config, CrawlerConfig, OutputConfig, SiteConfig, UserAgentConfig,
};
use crate::site::FieldSelector;
use crate::{ConfigError, ConfigResult};
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_sites(&config.sites)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> ConfigResult<()> {
    if config.batch_size < 1 || config.batch_size > 100 {
        return Err(ConfigError::Validation(format!(
            "batch_size must be between 1 and 100, got {}",
            config.batch_size
        )));
    }

    if config.inter_batch_delay < 100 {
        return Err(ConfigError::Validation(format!(
            "inter_batch_delay must be >= 100ms, got {}ms",
            config.inter_batch_delay
        )));
    }

    if config.fetch_timeout < 1 {
        return Err(ConfigError::Validation(
            "fetch_timeout must be at least 1 second".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> ConfigResult<()> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> ConfigResult<()> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates site entries: names, seeds and every CSS selector
fn validate_sites(sites: &[SiteConfig]) -> ConfigResult<()> {
    let mut names = HashSet::new();

    for site in sites {
        if site.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "site name cannot be empty".to_string(),
            ));
        }

        if !names.insert(site.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "site '{}' is configured more than once",
                site.name
            )));
        }

        if site.seeds.is_empty() {
            return Err(ConfigError::Validation(format!(
                "site '{}' must have at least one seed URL",
                site.name
            )));
        }

        for seed in &site.seeds {
            let url = Url::parse(seed).map_err(|e| {
                ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e))
            })?;

            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(ConfigError::Validation(format!(
                    "Seed URL '{}' must use http or https",
                    seed
                )));
            }
        }

        for prefix in &site.links.include_prefixes {
            if !prefix.starts_with('/') {
                return Err(ConfigError::Validation(format!(
                    "include prefix '{}' of site '{}' must start with '/'",
                    prefix, site.name
                )));
            }
        }

        validate_selectors(site)?;
    }

    Ok(())
}

fn validate_selectors(site: &SiteConfig) -> ConfigResult<()> {
    let product = &site.product;

    let mut raw_selectors: Vec<&str> = product.page_markers.iter().map(String::as_str).collect();
    raw_selectors.push(&product.name);
    raw_selectors.extend(product.price.iter().map(String::as_str));
    raw_selectors.extend(
        [
            &product.item,
            &product.number,
            &product.link,
            &product.oem,
            &product.availability,
            &product.category,
        ]
        .into_iter()
        .flatten()
        .map(String::as_str),
    );
    if let Some(compatible) = &product.compatible {
        raw_selectors.extend(compatibility_selectors(compatible));
    }
    if let Some(detail) = &product.detail {
        if product.item.is_none() {
            return Err(ConfigError::Validation(format!(
                "site '{}': product detail selectors need an item selector",
                site.name
            )));
        }
        raw_selectors.extend(
            [&detail.oem, &detail.availability, &detail.category]
                .into_iter()
                .flatten()
                .map(String::as_str),
        );
        if let Some(compatible) = &detail.compatible {
            raw_selectors.extend(compatibility_selectors(compatible));
        }
    }

    for raw in raw_selectors {
        FieldSelector::parse(raw).map_err(|_| ConfigError::InvalidSelector {
            site: site.name.clone(),
            selector: raw.to_string(),
        })?;
    }

    Ok(())
}

fn compatibility_selectors(rows: &CompatibilitySelectors) -> [&str; 4] {
    [
        rows.row.as_str(),
        rows.kind.as_str(),
        rows.make.as_str(),
        rows.model.as_str(),
    ]
}

/// Basic email validation
fn validate_email(email: &str) -> ConfigResult<()> {
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }
    Ok(())
}
