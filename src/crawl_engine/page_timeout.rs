//! Timeout utilities for fetch and scoring calls
//!
//! Every collaborator call that can suspend goes through one of these
//! wrappers, so no single page can hang a worker.

use std::future::Future;
use std::time::Duration;

use super::crawl_types::{CrawlError, CrawlResult};

/// Run `operation` with a deadline, mapping expiry through `on_timeout`.
pub async fn with_timeout<F, T>(
    operation: F,
    timeout: Duration,
    on_timeout: impl FnOnce() -> CrawlError,
) -> CrawlResult<T>
where
    F: Future<Output = CrawlResult<T>>,
{
    match tokio::time::timeout(timeout, operation).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout()),
    }
}

/// Fetch deadline: expiry is a transient fetch failure.
pub async fn with_page_timeout<F, T>(operation: F, timeout: Duration, url: &str) -> CrawlResult<T>
where
    F: Future<Output = CrawlResult<T>>,
{
    with_timeout(operation, timeout, || CrawlError::FetchTransient {
        url: url.to_string(),
        reason: format!("fetch timeout after {timeout:?}"),
        status: None,
    })
    .await
}

/// Estimator deadline: expiry is an `EstimatorTimeout`.
pub async fn with_estimator_timeout<F, T>(operation: F, timeout: Duration) -> CrawlResult<T>
where
    F: Future<Output = CrawlResult<T>>,
{
    with_timeout(operation, timeout, || CrawlError::EstimatorTimeout(timeout)).await
}
