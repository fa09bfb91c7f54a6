//! Per-host circuit breaker
//!
//! A host that keeps failing gets its circuit opened: its URLs fail fast
//! instead of spending fetch retries, until a cooldown lets a single probe
//! through.
//!
//! - Closed: requests proceed
//! - Open: requests are refused
//! - `HalfOpen`: cooldown elapsed, the next outcome decides

use std::time::{Duration, Instant};

use dashmap::DashMap;
use log::{debug, info, warn};

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    HalfOpen,
    Open,
}

/// Health tracking for a single host
#[derive(Debug, Clone)]
pub struct HostHealth {
    pub consecutive_failures: u32,
    pub total_attempts: u32,
    pub total_successes: u32,
    /// When the circuit last opened, for cooldown accounting
    pub opened_at: Option<Instant>,
    pub state: CircuitState,
}

impl HostHealth {
    fn new() -> Self {
        Self {
            consecutive_failures: 0,
            total_attempts: 0,
            total_successes: 0,
            opened_at: None,
            state: CircuitState::Closed,
        }
    }
}

/// Host health registry shared by all workers of a run
#[derive(Debug)]
pub struct CircuitBreaker {
    hosts: DashMap<String, HostHealth>,
    failure_threshold: u32,
    cooldown: Duration,
}

impl CircuitBreaker {
    /// # Arguments
    /// * `failure_threshold` - Open after this many consecutive failures
    /// * `cooldown` - Time an open circuit waits before a probe
    #[must_use]
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            hosts: DashMap::new(),
            failure_threshold: failure_threshold.max(1),
            cooldown,
        }
    }

    /// Whether a request to `host` may proceed right now.
    pub fn should_attempt(&self, host: &str) -> bool {
        let mut health = self
            .hosts
            .entry(host.to_string())
            .or_insert_with(HostHealth::new);

        let (state, opened_at) = (health.state, health.opened_at);
        match state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => match opened_at {
                Some(opened) if opened.elapsed() >= self.cooldown => {
                    health.state = CircuitState::HalfOpen;
                    info!(
                        target: "goalscrape::circuit",
                        "Circuit HALF-OPEN for {host} after {:?}",
                        opened.elapsed()
                    );
                    true
                }
                _ => false,
            },
        }
    }

    /// Record a successful fetch; a half-open circuit closes.
    pub fn record_success(&self, host: &str) {
        if let Some(mut health) = self.hosts.get_mut(host) {
            health.consecutive_failures = 0;
            health.total_successes += 1;
            health.total_attempts += 1;
            if health.state != CircuitState::Closed {
                health.state = CircuitState::Closed;
                health.opened_at = None;
                info!(target: "goalscrape::circuit", "Circuit CLOSED for {host}");
            }
        }
    }

    /// Record a failed fetch; may open the circuit.
    ///
    /// A failure while half-open re-opens immediately.
    pub fn record_failure(&self, host: &str, error: &str) {
        let mut health = self
            .hosts
            .entry(host.to_string())
            .or_insert_with(HostHealth::new);

        health.consecutive_failures += 1;
        health.total_attempts += 1;

        let reopen = health.state == CircuitState::HalfOpen;
        if reopen || health.consecutive_failures >= self.failure_threshold {
            if health.state != CircuitState::Open {
                warn!(
                    target: "goalscrape::circuit",
                    "Circuit OPEN for {host} after {} consecutive failures. Last error: {error}",
                    health.consecutive_failures
                );
            }
            health.state = CircuitState::Open;
            health.opened_at = Some(Instant::now());
        } else {
            debug!(
                target: "goalscrape::circuit",
                "Failure for {host} ({}/{}): {error}",
                health.consecutive_failures, self.failure_threshold
            );
        }
    }

    #[must_use]
    pub fn get_health(&self, host: &str) -> Option<HostHealth> {
        self.hosts.get(host).map(|r| r.value().clone())
    }

    /// Hosts currently refusing requests
    #[must_use]
    pub fn open_hosts(&self) -> Vec<String> {
        self.hosts
            .iter()
            .filter(|entry| entry.value().state == CircuitState::Open)
            .map(|entry| entry.key().clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stays_closed_on_success() {
        let cb = CircuitBreaker::new(3, Duration::from_secs(60));
        assert!(cb.should_attempt("example.com"));
        cb.record_success("example.com");

        let health = cb.get_health("example.com").expect("tracked after attempt");
        assert_eq!(health.state, CircuitState::Closed);
        assert_eq!(health.total_successes, 1);
    }

    #[test]
    fn opens_after_threshold() {
        let cb = CircuitBreaker::new(3, Duration::from_secs(60));
        for _ in 0..2 {
            cb.record_failure("example.com", "boom");
            assert!(cb.should_attempt("example.com"));
        }
        cb.record_failure("example.com", "boom");

        assert!(!cb.should_attempt("example.com"));
        assert_eq!(cb.open_hosts(), vec!["example.com".to_string()]);
        // Other hosts are unaffected
        assert!(cb.should_attempt("other.org"));
    }

    #[test]
    fn half_open_probe_closes_or_reopens() {
        let cb = CircuitBreaker::new(2, Duration::from_millis(20));
        cb.record_failure("example.com", "boom");
        cb.record_failure("example.com", "boom");
        assert!(!cb.should_attempt("example.com"));

        std::thread::sleep(Duration::from_millis(40));
        assert!(cb.should_attempt("example.com"));
        assert_eq!(
            cb.get_health("example.com").map(|h| h.state),
            Some(CircuitState::HalfOpen)
        );

        cb.record_failure("example.com", "still down");
        assert!(!cb.should_attempt("example.com"));

        std::thread::sleep(Duration::from_millis(40));
        assert!(cb.should_attempt("example.com"));
        cb.record_success("example.com");
        assert_eq!(
            cb.get_health("example.com").map(|h| h.state),
            Some(CircuitState::Closed)
        );
    }
}
