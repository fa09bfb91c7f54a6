//! Core configuration types for goal-directed crawl runs

use std::time::Duration;

use regex::Regex;
use serde::Serialize;

use crate::canonical_url::{CanonicalUrl, Canonicalizer};

/// Hard budgets for a single run
///
/// All fields are explicit. Defaults are applied by the config builder only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Limits {
    pub max_pages: usize,
    pub max_depth: u32,
    pub max_steps: u32,
    pub max_wall_clock: Duration,
    pub min_expected_value_to_enqueue: f64,
}

/// Validated run configuration
///
/// Built with [`CrawlConfig::builder`]; every instance has passed validation.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub(crate) base_url: CanonicalUrl,
    pub(crate) goal: String,
    pub(crate) limits: Limits,
    pub(crate) concurrency: usize,

    // Progress evaluation
    pub(crate) min_pages_before_goal_check: usize,
    pub(crate) volume_cap_pages: usize,
    pub(crate) diminishing_returns_window: usize,
    pub(crate) diminishing_returns_threshold: f64,

    // Fetching
    pub(crate) request_timeout: Duration,
    pub(crate) max_fetch_retries: u32,
    pub(crate) retry_base_delay: Duration,
    pub(crate) retry_max_delay: Duration,
    pub(crate) use_js: bool,
    pub(crate) request_headers: Vec<(String, String)>,
    pub(crate) max_concurrent_per_host: usize,
    pub(crate) circuit_breaker_failure_threshold: Option<u32>,
    pub(crate) circuit_breaker_cooldown: Duration,

    // Scoring
    pub(crate) estimator_timeout: Duration,

    // Scope
    pub(crate) canonicalizer: Canonicalizer,
    pub(crate) allow_subdomains: bool,
    pub(crate) allow_external_domains: bool,
    pub(crate) allowed_domains: Option<Vec<String>>,
    pub(crate) excluded_patterns: Option<Vec<String>>,
    /// Pre-compiled from `excluded_patterns` once at build time
    pub(crate) excluded_patterns_compiled: Vec<Regex>,
    pub(crate) skip_similar_paths: bool,
    pub(crate) max_links_per_page: usize,

    // Lifecycle
    pub(crate) cancel_grace_period: Duration,
    pub(crate) host_step_ceiling: Option<u32>,
}
