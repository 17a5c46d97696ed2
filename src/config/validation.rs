use crate::config::types::{Config, CrawlerConfig, DelayRange, OutputConfig};
use crate::ConfigError;
use std::collections::HashSet;
use std::path::Path;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_regions(&config.regions)?;
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the region list: non-empty, no blank keys, no duplicates
fn validate_regions(regions: &[String]) -> Result<(), ConfigError> {
    if regions.is_empty() {
        return Err(ConfigError::Validation(
            "at least one region must be configured".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for region in regions {
        let trimmed = region.trim_matches('/').trim();
        if trimmed.is_empty() {
            return Err(ConfigError::Validation(format!(
                "region key cannot be empty, got '{}'",
                region
            )));
        }

        if !seen.insert(trimmed) {
            return Err(ConfigError::Validation(format!(
                "region '{}' is listed more than once",
                region
            )));
        }
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    let base = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if base.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' has no host",
            config.base_url
        )));
    }

    if config.max_concurrent_regions < 1 || config.max_concurrent_regions > 32 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-regions must be between 1 and 32, got {}",
            config.max_concurrent_regions
        )));
    }

    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    validate_delay_range("request-delay", &config.request_delay)?;
    validate_delay_range("page-delay", &config.page_delay)?;
    validate_delay_range("retry-backoff", &config.retry_backoff)?;

    Ok(())
}

fn validate_delay_range(name: &str, range: &DelayRange) -> Result<(), ConfigError> {
    if range.min_ms > range.max_ms {
        return Err(ConfigError::Validation(format!(
            "{} min-ms ({}) must not exceed max-ms ({})",
            name, range.min_ms, range.max_ms
        )));
    }
    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.path.is_empty() {
        return Err(ConfigError::Validation(
            "output path cannot be empty".to_string(),
        ));
    }

    let extension = Path::new(&config.path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("xlsx") | Some("csv") => Ok(()),
        _ => Err(ConfigError::Validation(format!(
            "output path '{}' must end in .xlsx or .csv",
            config.path
        ))),
    }
}
