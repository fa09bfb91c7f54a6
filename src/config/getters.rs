//! Getter methods for `CrawlConfig`

use std::time::Duration;

use regex::Regex;

use crate::canonical_url::{CanonicalUrl, Canonicalizer};

use super::types::{CrawlConfig, Limits};

impl CrawlConfig {
    #[must_use]
    pub fn base_url(&self) -> &CanonicalUrl {
        &self.base_url
    }

    #[must_use]
    pub fn goal(&self) -> &str {
        &self.goal
    }

    #[must_use]
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    #[must_use]
    pub fn min_pages_before_goal_check(&self) -> usize {
        self.min_pages_before_goal_check
    }

    #[must_use]
    pub fn volume_cap_pages(&self) -> usize {
        self.volume_cap_pages
    }

    #[must_use]
    pub fn diminishing_returns_window(&self) -> usize {
        self.diminishing_returns_window
    }

    #[must_use]
    pub fn diminishing_returns_threshold(&self) -> f64 {
        self.diminishing_returns_threshold
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    #[must_use]
    pub fn max_fetch_retries(&self) -> u32 {
        self.max_fetch_retries
    }

    #[must_use]
    pub fn retry_base_delay(&self) -> Duration {
        self.retry_base_delay
    }

    #[must_use]
    pub fn retry_max_delay(&self) -> Duration {
        self.retry_max_delay
    }

    #[must_use]
    pub fn use_js(&self) -> bool {
        self.use_js
    }

    #[must_use]
    pub fn request_headers(&self) -> &[(String, String)] {
        &self.request_headers
    }

    #[must_use]
    pub fn max_concurrent_per_host(&self) -> usize {
        self.max_concurrent_per_host
    }

    /// `None` when the host circuit breaker is disabled
    #[must_use]
    pub fn circuit_breaker_failure_threshold(&self) -> Option<u32> {
        self.circuit_breaker_failure_threshold
    }

    #[must_use]
    pub fn circuit_breaker_cooldown(&self) -> Duration {
        self.circuit_breaker_cooldown
    }

    #[must_use]
    pub fn estimator_timeout(&self) -> Duration {
        self.estimator_timeout
    }

    #[must_use]
    pub fn canonicalizer(&self) -> &Canonicalizer {
        &self.canonicalizer
    }

    #[must_use]
    pub fn allow_subdomains(&self) -> bool {
        self.allow_subdomains
    }

    #[must_use]
    pub fn allow_external_domains(&self) -> bool {
        self.allow_external_domains
    }

    #[must_use]
    pub fn allowed_domains(&self) -> Option<&[String]> {
        self.allowed_domains.as_deref()
    }

    #[must_use]
    pub fn excluded_patterns(&self) -> Option<&[String]> {
        self.excluded_patterns.as_deref()
    }

    #[must_use]
    pub fn excluded_patterns_compiled(&self) -> &[Regex] {
        &self.excluded_patterns_compiled
    }

    #[must_use]
    pub fn skip_similar_paths(&self) -> bool {
        self.skip_similar_paths
    }

    #[must_use]
    pub fn max_links_per_page(&self) -> usize {
        self.max_links_per_page
    }

    #[must_use]
    pub fn cancel_grace_period(&self) -> Duration {
        self.cancel_grace_period
    }

    #[must_use]
    pub fn host_step_ceiling(&self) -> Option<u32> {
        self.host_step_ceiling
    }
}
