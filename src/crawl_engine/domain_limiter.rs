//! Per-host concurrency limiter
//!
//! Caps simultaneous fetches against one host regardless of the worker pool
//! size.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::crawl_types::{CrawlError, CrawlResult};

/// Lazily created semaphore per host
#[derive(Debug)]
pub struct DomainLimiter {
    host_semaphores: DashMap<String, Arc<Semaphore>>,
    max_per_host: usize,
}

impl DomainLimiter {
    #[must_use]
    pub fn new(max_per_host: usize) -> Self {
        Self {
            host_semaphores: DashMap::new(),
            max_per_host: max_per_host.max(1),
        }
    }

    /// Wait for a fetch slot on `host`.
    ///
    /// The permit is released when dropped.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Cancelled`] if the host's semaphore was closed.
    pub async fn acquire(&self, host: &str) -> CrawlResult<OwnedSemaphorePermit> {
        let semaphore = self
            .host_semaphores
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.max_per_host)))
            .clone();

        semaphore.acquire_owned().await.map_err(|_| {
            log::error!(target: "goalscrape::limiter", "Semaphore for '{host}' closed");
            CrawlError::Cancelled
        })
    }

    /// Free slots on `host` right now.
    #[must_use]
    pub fn available(&self, host: &str) -> usize {
        self.host_semaphores
            .get(host)
            .map_or(self.max_per_host, |s| s.available_permits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn limits_per_host_only() {
        let limiter = Arc::new(DomainLimiter::new(1));
        let held = limiter.acquire("a.com").await.expect("first permit");
        assert_eq!(limiter.available("a.com"), 0);

        // A different host is independent.
        let other = limiter.acquire("b.com").await.expect("other host");
        drop(other);

        let waiter = {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move { limiter.acquire("a.com").await.map(|_| ()) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(held);
        let joined = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter wakes after release")
            .expect("task joins");
        assert!(joined.is_ok());
    }
}
