//! Core `CrawlEventBus` struct definition and constructors

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize};
use tokio::sync::{Notify, broadcast};

use crate::crawl_events::config::EventBusConfig;
use crate::crawl_events::metrics::EventBusMetrics;
use crate::crawl_events::types::CrawlEvent;

/// Event bus for publishing and subscribing to crawl events
#[derive(Debug)]
pub struct CrawlEventBus {
    pub(super) sender: broadcast::Sender<CrawlEvent>,
    pub(super) config: Arc<EventBusConfig>,
    pub(super) metrics: EventBusMetrics,
    pub(super) shutdown: Arc<Notify>,
    pub(super) shutdown_flag: Arc<AtomicBool>,
    /// Live clones of this bus, for Drop semantics
    pub(super) num_instances: Arc<AtomicUsize>,
}

impl CrawlEventBus {
    /// Create a bus buffering up to `capacity` events
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::with_config(EventBusConfig {
            capacity,
            ..Default::default()
        })
    }

    #[must_use]
    pub fn with_config(config: EventBusConfig) -> Self {
        let config = EventBusConfig {
            capacity: config.capacity.max(1),
            ..config
        };
        let (sender, _) = broadcast::channel(config.capacity);
        Self {
            sender,
            config: Arc::new(config),
            metrics: EventBusMetrics::new(),
            shutdown: Arc::new(Notify::new()),
            shutdown_flag: Arc::new(AtomicBool::new(false)),
            num_instances: Arc::new(AtomicUsize::new(1)),
        }
    }

    #[must_use]
    pub fn config(&self) -> &EventBusConfig {
        &self.config
    }

    /// Live counters. Use `metrics().snapshot()` for a coherent view.
    #[must_use]
    pub fn metrics(&self) -> &EventBusMetrics {
        &self.metrics
    }

    /// Ratio of buffered events to capacity
    #[must_use]
    pub fn pressure(&self) -> f64 {
        self.sender.len() as f64 / self.config.capacity as f64
    }

    #[must_use]
    pub fn is_overloaded(&self) -> bool {
        self.pressure() >= self.config.overload_threshold
    }

    #[must_use]
    pub fn buffer_len(&self) -> usize {
        self.sender.len()
    }

    #[must_use]
    pub fn remaining_capacity(&self) -> usize {
        self.config.capacity.saturating_sub(self.sender.len())
    }
}
