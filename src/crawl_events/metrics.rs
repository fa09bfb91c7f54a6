use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Event bus counters, shared by every clone of the bus.
///
/// All counters use `Ordering::SeqCst` so snapshot reads are coherent.
#[derive(Debug, Clone, Default)]
pub struct EventBusMetrics {
    pub events_published: Arc<AtomicU64>,
    /// Published while nobody was listening
    pub events_unobserved: Arc<AtomicU64>,
    /// Refused: bus shut down or channel full
    pub events_rejected: Arc<AtomicU64>,
    pub active_subscribers: Arc<AtomicUsize>,
    pub peak_subscribers: Arc<AtomicUsize>,
}

impl EventBusMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a successful send that reached `subscribers` receivers.
    pub fn record_published(&self, subscribers: usize) {
        self.events_published.fetch_add(1, Ordering::SeqCst);
        self.update_subscriber_count(subscribers);
    }

    pub fn increment_unobserved(&self) {
        self.events_unobserved.fetch_add(1, Ordering::SeqCst);
    }

    pub fn increment_rejected(&self) {
        self.events_rejected.fetch_add(1, Ordering::SeqCst);
    }

    pub fn update_subscriber_count(&self, count: usize) {
        self.active_subscribers.store(count, Ordering::SeqCst);
        self.peak_subscribers.fetch_max(count, Ordering::SeqCst);
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            events_published: self.events_published.load(Ordering::SeqCst),
            events_unobserved: self.events_unobserved.load(Ordering::SeqCst),
            events_rejected: self.events_rejected.load(Ordering::SeqCst),
            active_subscribers: self.active_subscribers.load(Ordering::SeqCst),
            peak_subscribers: self.peak_subscribers.load(Ordering::SeqCst),
        }
    }

    pub fn reset(&self) {
        self.events_published.store(0, Ordering::SeqCst);
        self.events_unobserved.store(0, Ordering::SeqCst);
        self.events_rejected.store(0, Ordering::SeqCst);
        self.active_subscribers.store(0, Ordering::SeqCst);
        self.peak_subscribers.store(0, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub events_published: u64,
    pub events_unobserved: u64,
    pub events_rejected: u64,
    pub active_subscribers: usize,
    pub peak_subscribers: usize,
}

impl MetricsSnapshot {
    /// Publish attempts, accepted or not
    #[must_use]
    pub fn total_events(&self) -> u64 {
        self.events_published + self.events_rejected
    }

    /// Fraction of publish attempts the bus accepted, 1.0 when idle
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        let total = self.total_events();
        if total == 0 {
            return 1.0;
        }
        self.events_published as f64 / total as f64
    }
}
