//! Exponential backoff with jitter for transient fetch failures

use std::future::Future;
use std::time::Duration;

use log::warn;
use rand::Rng;

use super::crawl_types::{CrawlError, CrawlResult, FailureKind};

/// Retry configuration for fetches
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Initial retry delay
    pub initial_delay: Duration,
    /// Backoff multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Maximum retry delay, jitter included
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: crate::utils::DEFAULT_MAX_FETCH_RETRIES,
            initial_delay: crate::utils::DEFAULT_RETRY_BASE_DELAY,
            backoff_multiplier: 2.0,
            max_delay: crate::utils::DEFAULT_RETRY_MAX_DELAY,
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `attempt` (0-based), without jitter.
    ///
    /// Scaled by the failure kind so rate limits back off longer.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32, kind: FailureKind) -> Duration {
        let multiplier = self.backoff_multiplier.powi(attempt as i32) * kind.delay_multiplier();
        let delay_ms = (self.initial_delay.as_millis() as f64 * multiplier) as u64;
        Duration::from_millis(delay_ms).min(self.max_delay)
    }

    /// `delay_for_attempt` plus up to 25% random jitter, still capped.
    #[must_use]
    pub fn jittered_delay(&self, attempt: u32, kind: FailureKind) -> Duration {
        let base = self.delay_for_attempt(attempt, kind);
        let jitter_ms = (base.as_millis() as u64) / 4;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::rng().random_range(0..=jitter_ms)
        };
        (base + Duration::from_millis(jitter)).min(self.max_delay)
    }
}

fn failure_kind(error: &CrawlError) -> FailureKind {
    match error {
        CrawlError::FetchTransient {
            status: Some(status),
            ..
        } => FailureKind::from_status(*status).unwrap_or(FailureKind::Server),
        CrawlError::FetchTransient { reason, .. } => FailureKind::classify_message(reason),
        _ => FailureKind::Unknown,
    }
}

/// Run `f` until it succeeds, fails non-transiently, or runs out of retries.
///
/// A transient error that survives every retry is returned as `FetchFatal`.
pub async fn retry_with_backoff<F, Fut, T>(config: &RetryConfig, mut f: F) -> CrawlResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = CrawlResult<T>>,
{
    let mut attempt = 0;
    loop {
        match f(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_transient() => return Err(e),
            Err(e) => {
                if attempt >= config.max_retries {
                    warn!(
                        target: "goalscrape::retry",
                        "Max retries ({}) exceeded: {e}",
                        config.max_retries
                    );
                    return Err(e.into_fatal(attempt + 1));
                }

                let delay = config.jittered_delay(attempt, failure_kind(&e));
                warn!(
                    target: "goalscrape::retry",
                    "Retryable error, attempt {}/{}, retrying in {}ms: {e}",
                    attempt + 1,
                    config.max_retries,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
