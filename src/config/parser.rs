use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// The hash is logged at startup so a dataset can be traced back to the
/// exact configuration that produced it.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DelayRange, ListingKind};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
regions = ["shengzhoushi", "keqiaoqu/lc1"]

[crawler]
base-url = "https://sx.ke.com"
listing = "on-sale"
max-concurrent-regions = 2
request-delay = { min-ms = 100, max-ms = 200 }

[session]
source-id = "abc"

[session.cookies]
lianjia_uuid = "uuid-value"

[output]
path = "./sx.xlsx"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.regions, vec!["shengzhoushi", "keqiaoqu/lc1"]);
        assert_eq!(config.crawler.listing, ListingKind::OnSale);
        assert_eq!(config.crawler.max_concurrent_regions, 2);
        assert_eq!(config.crawler.request_delay, DelayRange::new(100, 200));
        assert_eq!(config.session.source_id.as_deref(), Some("abc"));
        assert_eq!(config.session.cookies.get("lianjia_uuid").unwrap(), "uuid-value");
    }

    #[test]
    fn test_defaults_follow_deal_crawler() {
        let config_content = r#"
regions = ["zhujishi"]

[crawler]
base-url = "https://sx.ke.com"

[output]
path = "./sx.csv"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.listing, ListingKind::Deal);
        assert_eq!(config.crawler.max_concurrent_regions, 3);
        assert_eq!(config.crawler.max_attempts, 3);
        assert_eq!(config.crawler.request_timeout_secs, 10);
        assert_eq!(config.crawler.request_delay, DelayRange::new(500, 1000));
        assert_eq!(config.crawler.page_delay, DelayRange::new(1000, 2000));
        assert_eq!(config.crawler.retry_backoff, DelayRange::new(1000, 3000));
        assert_eq!(config.session.accept_language, "zh-CN,zh;q=0.9");
        assert!(config.session.cookies.is_empty());
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/harvest.toml"));
        assert!(matches!(result.unwrap_err(), ConfigError::Io(_)));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_config_without_regions() {
        let config_content = r#"
[crawler]
base-url = "https://sx.ke.com"

[output]
path = "./sx.xlsx"
"#;

        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
