//! Subscription operations for the `CrawlEventBus`

use tokio::sync::broadcast;

use crate::crawl_events::streaming::FilteredReceiver;
use crate::crawl_events::types::CrawlEvent;

use super::core::CrawlEventBus;

impl CrawlEventBus {
    /// Receive every event published from now on
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CrawlEvent> {
        let receiver = self.sender.subscribe();
        if self.config.enable_metrics {
            self.metrics
                .update_subscriber_count(self.sender.receiver_count());
        }
        receiver
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[must_use]
    pub fn has_subscribers(&self) -> bool {
        self.subscriber_count() > 0
    }

    /// Subscribe to the events `filter` accepts
    pub fn subscribe_filtered<F>(&self, filter: F) -> FilteredReceiver<F>
    where
        F: Fn(&CrawlEvent) -> bool + Send + Sync + 'static,
    {
        FilteredReceiver::new(self.subscribe(), filter)
    }
}
