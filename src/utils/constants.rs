//! Shared configuration constants for goalscrape
//!
//! Every default the config builder applies lives here, so a run's limits can
//! be read off in one place.

use std::time::Duration;

/// Default page budget: 50 committed pages
pub const DEFAULT_MAX_PAGES: usize = 50;

/// Default maximum crawl depth: 3 levels
///
/// Limits how deep the crawler will follow links from the base URL.
pub const DEFAULT_MAX_DEPTH: u32 = 3;

/// Default scheduler step budget: 100 cycles
pub const DEFAULT_MAX_STEPS: u32 = 100;

/// Default wall-clock budget for a whole run
pub const DEFAULT_MAX_WALL_CLOCK: Duration = Duration::from_secs(300);

/// Frontier admission threshold for predicted link value
pub const DEFAULT_MIN_EXPECTED_VALUE: f64 = 0.1;

/// Worker pool size. 1 keeps runs strictly deterministic.
pub const DEFAULT_CONCURRENCY: usize = 1;

/// Goal and diminishing-returns checks only fire after this many pages
pub const DEFAULT_MIN_PAGES_BEFORE_GOAL_CHECK: usize = 3;

/// Page volume that counts as "enough" for the volume half of completeness
pub const DEFAULT_VOLUME_CAP_PAGES: usize = 10;

/// Window K for the diminishing-returns check
pub const DEFAULT_DIMINISHING_WINDOW: usize = 3;

/// Mean uniqueness below which the last K pages count as diminishing
pub const DEFAULT_DIMINISHING_THRESHOLD: f64 = 0.25;

/// Completeness at which the goal counts as satisfied
pub const GOAL_COMPLETENESS_THRESHOLD: f64 = 0.85;

/// Weight of keyword coverage inside completeness. Volume gets the rest.
pub const COMPLETENESS_COVERAGE_WEIGHT: f64 = 0.7;

/// Neutral score used whenever the estimator fails or times out
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Per-request fetch timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Retries for transient fetch failures before a URL is failed
pub const DEFAULT_MAX_FETCH_RETRIES: u32 = 3;

/// First backoff delay between fetch retries
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Upper bound on a single backoff delay
pub const DEFAULT_RETRY_MAX_DELAY: Duration = Duration::from_secs(10);

/// Per-call estimator timeout
pub const DEFAULT_ESTIMATOR_TIMEOUT: Duration = Duration::from_secs(10);

/// How long in-flight workers may keep running after cancellation
pub const DEFAULT_CANCEL_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Outbound links kept per page after canonicalization and scope filtering
pub const DEFAULT_MAX_LINKS_PER_PAGE: usize = 200;

/// Concurrent fetches allowed against a single host
pub const DEFAULT_MAX_CONCURRENT_PER_HOST: usize = 2;

/// Consecutive host failures before its circuit opens
pub const DEFAULT_CIRCUIT_BREAKER_THRESHOLD: u32 = 5;

/// Time an open circuit waits before letting a probe through
pub const DEFAULT_CIRCUIT_BREAKER_COOLDOWN: Duration = Duration::from_secs(60);

/// Characters of parent-element text kept as link context
pub const LINK_CONTEXT_MAX_CHARS: usize = 200;

/// Query parameters stripped during canonicalization.
///
/// Any parameter starting with `utm_` is stripped as well.
pub const DEFAULT_TRACKING_PARAMS: &[&str] = &[
    "fbclid", "gclid", "dclid", "msclkid", "mc_cid", "mc_eid", "_ga", "_gl", "ref", "yclid",
    "igshid",
];

/// User agent sent by the reference fetcher
pub const DEFAULT_USER_AGENT: &str =
    concat!("goalscrape/", env!("CARGO_PKG_VERSION"), " (+https://kodegen.ai)");
