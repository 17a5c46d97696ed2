//! Listing-Harvest: a resilient multi-region listing crawler
//!
//! This crate walks the paginated listing pages of a real-estate portal for a
//! set of regions, decodes each page into structured records, and merges the
//! results into one tabular dataset while tolerating flaky network conditions.

pub mod config;
pub mod crawler;
pub mod dataset;
pub mod decoder;
pub mod output;
pub mod state;

use thiserror::Error;

/// Main error type for Listing-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Cannot build page URL for region '{region}': {message}")]
    PageUrl { region: String, message: String },

    #[error("Fatal failure for {url}: {reason}")]
    Fatal { url: String, reason: String },

    #[error("Panic while processing {step}: {message}")]
    Panicked { step: String, message: String },

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::RegionState,
        to: state::RegionState,
    },

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Output-specific errors
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("Primary output failed ({primary}); fallback to {fallback_path} also failed ({fallback})")]
    FallbackFailed {
        primary: Box<OutputError>,
        fallback: Box<OutputError>,
        fallback_path: String,
    },
}

/// Result type alias for Listing-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for output operations
pub type OutputResult<T> = std::result::Result<T, OutputError>;

// Re-export commonly used types
pub use config::{Config, ListingKind};
pub use crawler::{Coordinator, RegionResult, RegionStatus};
pub use dataset::{aggregate, CrawlReport, Dataset, Record, Schema};
pub use decoder::PageDecoder;
pub use state::RegionState;
