//! Shutdown operations for the `CrawlEventBus`

use std::sync::atomic::Ordering;

use crate::crawl_events::types::{CrawlEvent, ShutdownReason};

use super::core::CrawlEventBus;

impl CrawlEventBus {
    /// Signal shutdown to all subscribers. Idempotent; shared by all clones.
    pub fn shutdown(&self) {
        self.shutdown_flag.store(true, Ordering::SeqCst);
        self.shutdown.notify_waiters();
        log::debug!(target: "goalscrape::events", "Event bus shutdown signaled");
    }

    /// Resolve once shutdown is signaled. Meant for `tokio::select!` loops.
    pub async fn wait_for_shutdown(&self) {
        let notified = self.shutdown.notified();
        if self.is_shutdown() {
            return;
        }
        notified.await;
    }

    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown_flag.load(Ordering::SeqCst)
    }

    /// Stop accepting events, publish a final `Shutdown` event, give
    /// subscribers the configured drain period, then wake waiters.
    pub async fn shutdown_gracefully(&self, reason: ShutdownReason) {
        log::info!(target: "goalscrape::events", "Shutting down event bus: {reason:?}");

        self.shutdown_flag.store(true, Ordering::SeqCst);
        let _ = self.publish(CrawlEvent::shutdown(reason));

        tokio::time::sleep(self.config.drain_period).await;
        self.shutdown.notify_waiters();
    }
}
