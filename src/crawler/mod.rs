//! Crawler module for listing page retrieval
//!
//! This module contains the crawl orchestration, including:
//! - Paced HTTP fetching and outcome classification
//! - Retry with widening, cancellable backoff
//! - Page-count discovery from the first page of a region
//! - Sequential per-region page walking
//! - Bounded multi-region coordination

mod coordinator;
mod fetcher;
mod pagination;
mod region;
mod retry;

pub use coordinator::{run_crawl, Coordinator, CrawlOutput};
pub use fetcher::{build_http_client, page_url, FetchExecutor, FetchOutcome, PageRequest};
pub use pagination::{read_pagination, resolve_page_count, PageData, PaginationInfo};
pub use region::{run_region, CrawlContext, RegionResult, RegionStatus};
pub use retry::{fetch_with_retry, BackoffPolicy, PageFetch, RetriedFetch};

use crate::config::Config;
use crate::HarvestError;
use tokio_util::sync::CancellationToken;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the HTTP client with the session settings
/// 2. Crawl every configured region under the concurrency limit
/// 3. Merge the region results into one dataset and report
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `cancel` - Cancels the run; regions in flight stop at the next page
///
/// # Returns
///
/// * `Ok(CrawlOutput)` - Crawl finished, possibly with failed regions
/// * `Err(HarvestError)` - Crawl could not start
pub async fn crawl(config: Config, cancel: &CancellationToken) -> Result<CrawlOutput, HarvestError> {
    run_crawl(config, cancel).await
}
