//! Crawler coordinator - multi-region orchestration
//!
//! This module runs one region worker per requested region under a bounded
//! pool, including:
//! - Building the shared HTTP client and crawl context
//! - Limiting the number of regions in flight with a semaphore
//! - Isolating panics and errors of individual regions
//! - Stopping submission of new regions when the run is cancelled
//! - Handing the collected results to the aggregator

use crate::config::Config;
use crate::crawler::fetcher::{build_http_client, FetchExecutor};
use crate::crawler::region::{panic_message, run_region, CrawlContext, RegionResult};
use crate::crawler::retry::BackoffPolicy;
use crate::dataset::{aggregate, CrawlReport, Dataset, Schema};
use crate::decoder::{decoder_for, PageDecoder};
use crate::HarvestError;
use futures::FutureExt;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    context: Arc<CrawlContext>,
}

impl Coordinator {
    /// Creates a coordinator using the decoder of the configured listing kind
    ///
    /// # Arguments
    ///
    /// * `config` - The validated crawl configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(HarvestError)` - The HTTP client could not be built
    pub fn new(config: Config) -> Result<Self, HarvestError> {
        let decoder = decoder_for(config.crawler.listing);
        Self::with_decoder(config, decoder)
    }

    /// Creates a coordinator with an explicit page decoder
    pub fn with_decoder(
        config: Config,
        decoder: Arc<dyn PageDecoder>,
    ) -> Result<Self, HarvestError> {
        let client = build_http_client(&config)?;
        let config = Arc::new(config);

        let context = CrawlContext {
            fetcher: FetchExecutor::new(client, Arc::clone(&config)),
            decoder,
            policy: BackoffPolicy::from_config(&config.crawler),
            page_delay: config.crawler.page_delay,
        };

        Ok(Self {
            config,
            context: Arc::new(context),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Column schema of the records this coordinator produces
    pub fn schema(&self) -> Schema {
        self.context.decoder.schema()
    }

    /// Crawls the given regions, at most `max-concurrent-regions` at a time
    ///
    /// Results come back in completion order, one per requested region.
    /// Once `cancel` fires no further region is started; regions already
    /// running wind down on their own and the rest are reported as not
    /// started.
    pub async fn run(&self, regions: &[String], cancel: &CancellationToken) -> Vec<RegionResult> {
        let limit = self.config.crawler.max_concurrent_regions.max(1) as usize;
        let semaphore = Arc::new(Semaphore::new(limit));
        let mut tasks = JoinSet::new();
        let mut results = Vec::with_capacity(regions.len());

        tracing::info!(
            "Crawling {} regions, up to {} at a time",
            regions.len(),
            limit
        );

        for (index, region) in regions.iter().enumerate() {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
            };

            let Some(permit) = permit else {
                let pending = &regions[index..];
                tracing::warn!("Run cancelled, {} regions not started", pending.len());
                results.extend(pending.iter().map(|r| RegionResult::not_started(r)));
                break;
            };

            let context = Arc::clone(&self.context);
            let cancel = cancel.clone();
            let region = region.clone();
            let span = tracing::info_span!("region", region = %region);

            tasks.spawn(
                async move {
                    let _permit = permit;
                    let outcome = AssertUnwindSafe(run_region(&context, &region, &cancel))
                        .catch_unwind()
                        .await;

                    match outcome {
                        Ok(result) => result,
                        Err(payload) => {
                            let message = panic_message(payload.as_ref());
                            tracing::error!("Region {} worker panicked: {}", region, message);
                            RegionResult::failed(&region, format!("worker panicked: {}", message))
                        }
                    }
                }
                .instrument(span),
            );
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => tracing::error!("Region task did not complete: {}", e),
            }
        }

        // A task that vanished without a result still has to show up in the report
        let reported: HashSet<String> = results.iter().map(|r| r.region.clone()).collect();
        for region in regions {
            if !reported.contains(region) {
                results.push(RegionResult::failed(region, "task ended without a result"));
            }
        }

        results
    }
}

/// Everything a finished crawl produced
#[derive(Debug, Clone)]
pub struct CrawlOutput {
    pub dataset: Dataset,
    pub report: CrawlReport,
}

/// Runs a complete crawl of the configured regions
///
/// This function orchestrates the entire crawl process:
///
/// 1. Build the HTTP client and region context
/// 2. Run region workers under the concurrency limit
/// 3. Aggregate their results in configured region order
///
/// # Arguments
///
/// * `config` - The validated crawl configuration
/// * `cancel` - Run-level cancellation token
///
/// # Returns
///
/// * `Ok(CrawlOutput)` - The dataset and the per-region report; region
///   failures are part of the report, never an error
/// * `Err(HarvestError)` - The crawl could not be set up
///
/// # Example
///
/// ```no_run
/// use listing_harvest::config::load_config;
/// use listing_harvest::crawler::run_crawl;
/// use std::path::Path;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let output = run_crawl(config, &CancellationToken::new()).await?;
/// println!("{} records", output.dataset.len());
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(
    config: Config,
    cancel: &CancellationToken,
) -> Result<CrawlOutput, HarvestError> {
    let regions = config.regions.clone();
    let coordinator = Coordinator::new(config)?;
    let started = Instant::now();

    let results = coordinator.run(&regions, cancel).await;
    let (dataset, report) = aggregate(&regions, results, coordinator.schema());

    tracing::info!(
        "Crawl finished in {:?}: {} records from {} regions",
        started.elapsed(),
        report.total_records,
        regions.len()
    );

    Ok(CrawlOutput { dataset, report })
}
