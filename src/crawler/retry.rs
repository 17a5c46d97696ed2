//! Retry policy and combinator for page fetches
//!
//! The fetcher performs one attempt; this module decides whether and when to
//! try again. Waits widen with every retry and are cut short by run
//! cancellation.

use crate::config::{CrawlerConfig, DelayRange};
use crate::crawler::fetcher::FetchOutcome;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Upper bound on a single backoff wait
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Maps a retry number to a randomized wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Attempts per page, including the first one
    pub max_attempts: u32,

    /// Wait range before the first retry
    pub base: DelayRange,

    /// Cap applied to every wait
    pub ceiling: Duration,
}

impl BackoffPolicy {
    pub fn new(max_attempts: u32, base: DelayRange) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base,
            ceiling: MAX_BACKOFF,
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(config.max_attempts, config.retry_backoff)
    }

    /// Wait range before retry `retry` (1-based): the base range scaled by `retry`
    pub fn range_for(&self, retry: u32) -> DelayRange {
        self.base.scaled(u64::from(retry.max(1)))
    }

    /// Draws the wait before retry `retry`, capped at the ceiling
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.range_for(retry).sample().min(self.ceiling)
    }

    /// Whether another attempt is allowed after `attempts` have been made
    pub fn should_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }
}

/// Final outcome of fetching one page under the retry policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageFetch {
    /// Page body received
    Fetched(String),

    /// Every attempt failed with a retryable error
    Exhausted { reason: String },

    /// A non-recoverable failure; no retries were made after it
    Fatal { reason: String },

    /// The run was cancelled before the page could be fetched
    Cancelled,
}

/// A page fetch together with the work it took
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetriedFetch {
    pub outcome: PageFetch,

    /// Network attempts made
    pub attempts: u32,

    /// Backoff waits started between attempts
    pub backoff_waits: u32,
}

/// Runs `attempt` until it succeeds, fails fatally, or the policy gives up
///
/// `attempt` receives the 1-based attempt number. Cancellation is checked
/// before every backoff wait and interrupts a wait in progress.
pub async fn fetch_with_retry<F, Fut>(
    policy: &BackoffPolicy,
    cancel: &CancellationToken,
    label: &str,
    mut attempt: F,
) -> RetriedFetch
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = FetchOutcome>,
{
    let mut attempts = 0;
    let mut backoff_waits = 0;

    loop {
        attempts += 1;

        let reason = match attempt(attempts).await {
            FetchOutcome::Success(body) => {
                return RetriedFetch {
                    outcome: PageFetch::Fetched(body),
                    attempts,
                    backoff_waits,
                };
            }
            FetchOutcome::FatalFailure(reason) => {
                tracing::error!("{}: fatal failure, not retrying: {}", label, reason);
                return RetriedFetch {
                    outcome: PageFetch::Fatal { reason },
                    attempts,
                    backoff_waits,
                };
            }
            FetchOutcome::RetryableFailure(reason) => reason,
        };

        if !policy.should_retry(attempts) {
            tracing::warn!(
                "{}: giving up after {} attempts: {}",
                label,
                attempts,
                reason
            );
            return RetriedFetch {
                outcome: PageFetch::Exhausted { reason },
                attempts,
                backoff_waits,
            };
        }

        if cancel.is_cancelled() {
            return RetriedFetch {
                outcome: PageFetch::Cancelled,
                attempts,
                backoff_waits,
            };
        }

        let wait = policy.delay_for(attempts);
        tracing::warn!(
            "{}: attempt {}/{} failed ({}), retrying in {:?}",
            label,
            attempts,
            policy.max_attempts,
            reason,
            wait
        );

        backoff_waits += 1;
        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = cancel.cancelled() => {
                return RetriedFetch {
                    outcome: PageFetch::Cancelled,
                    attempts,
                    backoff_waits,
                };
            }
        }
    }
}
