use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Main configuration structure for Listing-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Region keys to crawl, in the order the dataset is grouped by
    #[serde(default)]
    pub regions: Vec<String>,
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    pub output: OutputConfig,
}

/// Which listing section of the portal is crawled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListingKind {
    /// Closed transactions (`/chengjiao/`)
    #[default]
    Deal,
    /// Homes currently for sale (`/ershoufang/`)
    OnSale,
}

impl ListingKind {
    /// Path segment of the listing section on the portal
    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::Deal => "chengjiao",
            Self::OnSale => "ershoufang",
        }
    }

    /// Name as written in the configuration file
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deal => "deal",
            Self::OnSale => "on-sale",
        }
    }
}

/// An inclusive range of milliseconds a randomized pause is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DelayRange {
    #[serde(rename = "min-ms")]
    pub min_ms: u64,

    #[serde(rename = "max-ms")]
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// A range that never pauses
    pub const fn zero() -> Self {
        Self::new(0, 0)
    }

    /// Draws a pause uniformly from the range
    pub fn sample(&self) -> Duration {
        if self.max_ms <= self.min_ms {
            return Duration::from_millis(self.min_ms);
        }
        Duration::from_millis(rand::random_range(self.min_ms..=self.max_ms))
    }

    /// Returns the range with both bounds multiplied by `factor`
    pub fn scaled(&self, factor: u64) -> Self {
        Self::new(
            self.min_ms.saturating_mul(factor),
            self.max_ms.saturating_mul(factor),
        )
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Scheme and host of the portal, e.g. `https://sx.ke.com`
    #[serde(rename = "base-url")]
    pub base_url: String,

    #[serde(default)]
    pub listing: ListingKind,

    /// Maximum number of regions crawled at the same time
    #[serde(rename = "max-concurrent-regions", default = "default_concurrency")]
    pub max_concurrent_regions: u32,

    #[serde(rename = "request-timeout-secs", default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Attempts per page, including the first one
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Pause before every request
    #[serde(rename = "request-delay", default = "default_request_delay")]
    pub request_delay: DelayRange,

    /// Pause between two pages of the same region
    #[serde(rename = "page-delay", default = "default_page_delay")]
    pub page_delay: DelayRange,

    /// Base range for the wait before a retry; widened on each further retry
    #[serde(rename = "retry-backoff", default = "default_retry_backoff")]
    pub retry_backoff: DelayRange,
}

impl CrawlerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_concurrency() -> u32 {
    3
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    3
}

fn default_request_delay() -> DelayRange {
    DelayRange::new(500, 1000)
}

fn default_page_delay() -> DelayRange {
    DelayRange::new(1000, 2000)
}

fn default_retry_backoff() -> DelayRange {
    DelayRange::new(1000, 3000)
}

/// Session material sent with every request
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    #[serde(rename = "accept-language", default = "default_accept_language")]
    pub accept_language: String,

    /// Opaque `srcid` query parameter issued by the portal
    #[serde(rename = "source-id", default)]
    pub source_id: Option<String>,

    /// Session cookies (name -> value)
    #[serde(default)]
    pub cookies: BTreeMap<String, String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
            source_id: None,
            cookies: BTreeMap::new(),
        }
    }
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}

fn default_accept_language() -> String {
    "zh-CN,zh;q=0.9".to_string()
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path of the dataset file (`.xlsx` or `.csv`)
    pub path: String,
}
