//! Publishing operations for the `CrawlEventBus`

use log::{debug, trace};

use crate::crawl_events::config::BackpressureMode;
use crate::crawl_events::errors::EventBusError;
use crate::crawl_events::sink::EventSink;
use crate::crawl_events::types::CrawlEvent;

use super::core::CrawlEventBus;

impl CrawlEventBus {
    /// Publish an event to all current subscribers.
    ///
    /// Returns the number of subscribers that will see the event.
    ///
    /// # Errors
    ///
    /// - `Shutdown` after `shutdown()` (the final `Shutdown` event excepted)
    /// - `ChannelFull` in [`BackpressureMode::Error`] at capacity
    /// - `NoSubscribers` when nobody is listening
    pub fn publish(&self, event: CrawlEvent) -> Result<usize, EventBusError> {
        if self.is_shutdown() && !matches!(event, CrawlEvent::Shutdown { .. }) {
            self.record_rejected();
            return Err(EventBusError::Shutdown);
        }

        if self.config.backpressure_mode == BackpressureMode::Error
            && self.sender.len() >= self.config.capacity
        {
            self.record_rejected();
            return Err(EventBusError::ChannelFull);
        }

        let kind = event.kind();
        match self.sender.send(event) {
            Ok(subscribers) => {
                if self.config.enable_metrics {
                    self.metrics.record_published(subscribers);
                }
                trace!(target: "goalscrape::events", "published {kind} to {subscribers} subscribers");
                Ok(subscribers)
            }
            Err(_) => {
                if self.config.enable_metrics {
                    self.metrics.increment_unobserved();
                    self.metrics.update_subscriber_count(0);
                }
                debug!(target: "goalscrape::events", "published {kind} with no active subscribers");
                Err(EventBusError::NoSubscribers)
            }
        }
    }

    fn record_rejected(&self) {
        if self.config.enable_metrics {
            self.metrics.increment_rejected();
        }
    }
}

impl EventSink for CrawlEventBus {
    fn emit(&self, event: CrawlEvent) {
        // Nobody listening is normal for a sink.
        let _ = self.publish(event);
    }
}
