//! Region worker: drives one region from its first page to its last
//!
//! Pages of a region are fetched strictly in order. Page 1 is fetched once
//! and serves both as pagination input and as the first page of records.
//! A page that exhausts its retries contributes no records but does not stop
//! the region; a fatal failure ends the region, keeping what was collected.

use crate::config::DelayRange;
use crate::crawler::fetcher::FetchExecutor;
use crate::crawler::pagination::resolve_page_count;
use crate::crawler::retry::{fetch_with_retry, BackoffPolicy, PageFetch};
use crate::dataset::Record;
use crate::decoder::PageDecoder;
use crate::state::RegionState;
use crate::HarvestError;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Everything a region worker needs, shared read-only between workers
pub struct CrawlContext {
    pub fetcher: FetchExecutor,
    pub decoder: Arc<dyn PageDecoder>,
    pub policy: BackoffPolicy,
    pub page_delay: DelayRange,
}

/// Summary status of a finished region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionStatus {
    /// Every page was fetched and decoded
    Complete,

    /// Some pages exhausted their retries and contributed nothing
    Incomplete,

    /// The region has no listings
    NoData,

    /// The run was cancelled before the region finished
    Interrupted,

    /// The worker stopped on an error
    Failed,
}

impl RegionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Incomplete => "incomplete",
            Self::NoData => "no_data",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RegionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one region worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionResult {
    pub region: String,

    /// Records of every successful page, in page order
    pub records: Vec<Record>,

    /// False if the worker stopped on an error
    pub success: bool,

    /// Page count reported by the first page (0 when unknown or empty)
    pub pages_total: u32,

    pub pages_attempted: u32,
    pub pages_succeeded: u32,

    /// Pages given up on after exhausting their retries
    pub pages_exhausted: u32,

    /// The run was cancelled while this region was pending or in flight
    pub cancelled: bool,

    /// Why the region failed, if it did
    pub error: Option<String>,
}

impl RegionResult {
    pub fn new(region: &str) -> Self {
        Self {
            region: region.to_string(),
            records: Vec::new(),
            success: true,
            pages_total: 0,
            pages_attempted: 0,
            pages_succeeded: 0,
            pages_exhausted: 0,
            cancelled: false,
            error: None,
        }
    }

    /// A region whose worker failed before producing anything
    pub fn failed(region: &str, reason: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(reason.into()),
            ..Self::new(region)
        }
    }

    /// A region never started because the run was cancelled
    pub fn not_started(region: &str) -> Self {
        Self {
            cancelled: true,
            ..Self::new(region)
        }
    }

    pub fn status(&self) -> RegionStatus {
        if !self.success {
            RegionStatus::Failed
        } else if self.cancelled {
            RegionStatus::Interrupted
        } else if self.pages_exhausted > 0 {
            RegionStatus::Incomplete
        } else if self.pages_total == 0 {
            RegionStatus::NoData
        } else {
            RegionStatus::Complete
        }
    }
}

/// Crawls every page of one region
///
/// Never returns an error: failures are folded into the result together with
/// the records gathered before them.
pub async fn run_region(
    context: &CrawlContext,
    region: &str,
    cancel: &CancellationToken,
) -> RegionResult {
    let mut worker = RegionWorker::new(context, region, cancel);

    match worker.drive().await {
        Ok(()) => worker.finish(),
        Err(e) => worker.fail(e),
    }
}

struct RegionWorker<'a> {
    context: &'a CrawlContext,
    cancel: &'a CancellationToken,
    state: RegionState,
    result: RegionResult,
}

impl<'a> RegionWorker<'a> {
    fn new(context: &'a CrawlContext, region: &str, cancel: &'a CancellationToken) -> Self {
        Self {
            context,
            cancel,
            state: RegionState::Init,
            result: RegionResult::new(region),
        }
    }

    fn region(&self) -> &str {
        &self.result.region
    }

    fn transition(&mut self, next: RegionState) -> Result<(), HarvestError> {
        if !self.state.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::trace!("Region {}: {} -> {}", self.region(), self.state, next);
        self.state = next;
        Ok(())
    }

    async fn drive(&mut self) -> Result<(), HarvestError> {
        if self.cancel.is_cancelled() {
            self.result.cancelled = true;
            return Ok(());
        }

        let Some(first_page) = self.fetch_page(1).await? else {
            if !self.result.cancelled {
                tracing::warn!(
                    "Region {}: first page unavailable, region yields no records",
                    self.region()
                );
            }
            return Ok(());
        };

        self.transition(RegionState::ResolvingPages)?;
        let decoder = self.context.decoder.as_ref();
        let total = self.guarded("page count", || {
            resolve_page_count(self.region(), &first_page, decoder)
        })?;
        self.result.pages_total = total;

        if total == 0 {
            return self.transition(RegionState::NoData);
        }

        let mut first_page = Some(first_page);
        for page in 1..=total {
            if page > 1 {
                self.pause_between_pages().await;
                if self.cancel.is_cancelled() {
                    self.result.cancelled = true;
                    tracing::info!(
                        "Region {}: run cancelled, stopping before page {}/{}",
                        self.region(),
                        page,
                        total
                    );
                    break;
                }
            }

            self.transition(RegionState::FetchingPage(page))?;

            let body = match first_page.take() {
                Some(body) => Some(body),
                None => self.fetch_page(page).await?,
            };

            match body {
                Some(html) => {
                    let decoder = self.context.decoder.as_ref();
                    let records = self.guarded(&format!("page {}", page), || decoder.decode(&html))?;
                    self.result.pages_succeeded += 1;
                    let on_page = records.len();
                    self.result.records.extend(records);

                    if on_page == 0 {
                        tracing::info!(
                            "Region {} page {}/{}: no records",
                            self.region(),
                            page,
                            total
                        );
                    } else {
                        tracing::info!(
                            "Region {} page {}/{}: {} records, {} so far",
                            self.region(),
                            page,
                            total,
                            on_page,
                            self.result.records.len()
                        );
                    }
                }
                None if self.result.cancelled => break,
                None => {}
            }
        }

        Ok(())
    }

    /// Runs page-processing code, turning a panic into a region failure
    ///
    /// The worker's accumulated result lives outside the guarded call, so the
    /// records of earlier pages survive a panic while handling a later one.
    fn guarded<T>(&self, step: &str, f: impl FnOnce() -> T) -> Result<T, HarvestError> {
        panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| HarvestError::Panicked {
            step: step.to_string(),
            message: panic_message(payload.as_ref()),
        })
    }

    /// Fetches one page under the retry policy
    ///
    /// Returns `Ok(None)` for pages that were given up on or cancelled.
    async fn fetch_page(&mut self, page: u32) -> Result<Option<String>, HarvestError> {
        let context = self.context;
        let request = context.fetcher.page_request(self.region(), page)?;
        let label = format!("Region {} page {}", request.region, page);
        self.result.pages_attempted += 1;

        let fetcher = &context.fetcher;
        let request_ref = &request;
        let fetched = fetch_with_retry(&context.policy, self.cancel, &label, move |_| {
            fetcher.fetch(request_ref)
        })
        .await;

        match fetched.outcome {
            PageFetch::Fetched(body) => Ok(Some(body)),
            PageFetch::Exhausted { reason } => {
                self.result.pages_exhausted += 1;
                tracing::error!(
                    "{}: exhausted {} attempts, skipping page ({})",
                    label,
                    fetched.attempts,
                    reason
                );
                Ok(None)
            }
            PageFetch::Fatal { reason } => Err(HarvestError::Fatal {
                url: request.url.to_string(),
                reason,
            }),
            PageFetch::Cancelled => {
                self.result.cancelled = true;
                tracing::info!("{}: run cancelled, page abandoned", label);
                Ok(None)
            }
        }
    }

    /// Inter-page pacing; returns early when the run is cancelled
    async fn pause_between_pages(&self) {
        let pause = self.context.page_delay.sample();
        if pause.is_zero() {
            return;
        }

        tokio::select! {
            _ = tokio::time::sleep(pause) => {}
            _ = self.cancel.cancelled() => {}
        }
    }

    fn finish(mut self) -> RegionResult {
        if !self.state.is_terminal() {
            // Active states can always reach Done
            self.state = RegionState::Done;
        }

        tracing::info!(
            "Region {} finished ({}): {} records from {}/{} pages",
            self.result.region,
            self.result.status(),
            self.result.records.len(),
            self.result.pages_succeeded,
            self.result.pages_attempted
        );
        self.result
    }

    fn fail(mut self, error: HarvestError) -> RegionResult {
        tracing::error!(
            "Region {} failed in state {}: {} (keeping {} records)",
            self.result.region,
            self.state,
            error,
            self.result.records.len()
        );

        self.state = RegionState::Done;
        self.result.success = false;
        self.result.error = Some(error.to_string());
        self.result
    }
}

/// Extracts a readable message from a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(payload.as_ref()), "static message");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(payload.as_ref()), "owned message");

        let payload: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }

    #[test]
    fn test_status_precedence() {
        let mut result = RegionResult::new("alpha");
        assert_eq!(result.status(), RegionStatus::NoData);

        result.pages_total = 2;
        assert_eq!(result.status(), RegionStatus::Complete);

        result.pages_exhausted = 1;
        assert_eq!(result.status(), RegionStatus::Incomplete);

        result.cancelled = true;
        assert_eq!(result.status(), RegionStatus::Interrupted);

        result.success = false;
        assert_eq!(result.status(), RegionStatus::Failed);
    }

    #[test]
    fn test_exhausted_first_page_is_incomplete_not_empty() {
        let mut result = RegionResult::new("alpha");
        result.pages_attempted = 1;
        result.pages_exhausted = 1;
        assert_eq!(result.status(), RegionStatus::Incomplete);
    }

    #[test]
    fn test_constructors() {
        let failed = RegionResult::failed("beta", "boom");
        assert_eq!(failed.status(), RegionStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("boom"));

        let pending = RegionResult::not_started("gamma");
        assert_eq!(pending.status(), RegionStatus::Interrupted);
        assert_eq!(pending.pages_attempted, 0);
    }
}
