//! Type-safe builder for `CrawlConfig` using the typestate pattern
//!
//! `base_url` and `goal` must be supplied, in that order, before `build()`
//! becomes available. Every other setting has a default from
//! [`crate::utils::constants`] and may be set in any state.

use std::marker::PhantomData;
use std::time::Duration;

use regex::Regex;

use crate::canonical_url::Canonicalizer;
use crate::crawl_engine::crawl_types::{CrawlError, CrawlResult};
use crate::utils::{
    DEFAULT_CANCEL_GRACE_PERIOD, DEFAULT_CIRCUIT_BREAKER_COOLDOWN,
    DEFAULT_CIRCUIT_BREAKER_THRESHOLD, DEFAULT_CONCURRENCY, DEFAULT_DIMINISHING_THRESHOLD,
    DEFAULT_DIMINISHING_WINDOW, DEFAULT_ESTIMATOR_TIMEOUT, DEFAULT_MAX_CONCURRENT_PER_HOST,
    DEFAULT_MAX_DEPTH, DEFAULT_MAX_FETCH_RETRIES, DEFAULT_MAX_LINKS_PER_PAGE, DEFAULT_MAX_PAGES,
    DEFAULT_MAX_STEPS, DEFAULT_MAX_WALL_CLOCK, DEFAULT_MIN_EXPECTED_VALUE,
    DEFAULT_MIN_PAGES_BEFORE_GOAL_CHECK, DEFAULT_REQUEST_TIMEOUT, DEFAULT_RETRY_BASE_DELAY,
    DEFAULT_RETRY_MAX_DELAY, DEFAULT_TRACKING_PARAMS, DEFAULT_VOLUME_CAP_PAGES,
};

use super::types::{CrawlConfig, Limits};

/// Compile a glob pattern into a regex
///
/// `*` matches any sequence. Compiled once at build time so the link filter
/// never compiles in the hot path.
fn compile_glob_pattern(pattern: &str) -> CrawlResult<Regex> {
    let regex_pattern = regex::escape(pattern).replace(r"\*", ".*");
    let anchored = format!("^{regex_pattern}$");

    Regex::new(&anchored)
        .map_err(|e| CrawlError::Config(format!("Invalid glob pattern '{pattern}': {e}")))
}

// Type states for the builder
pub struct WithBaseUrl;
pub struct WithGoal;

#[derive(Debug, Clone)]
pub(crate) struct ConfigDraft {
    base_url: Option<String>,
    goal: Option<String>,
    max_pages: usize,
    max_depth: u32,
    max_steps: u32,
    max_wall_clock: Duration,
    min_expected_value_to_enqueue: f64,
    concurrency: usize,
    min_pages_before_goal_check: usize,
    volume_cap_pages: usize,
    diminishing_returns_window: usize,
    diminishing_returns_threshold: f64,
    request_timeout: Duration,
    max_fetch_retries: u32,
    retry_base_delay: Duration,
    retry_max_delay: Duration,
    use_js: bool,
    request_headers: Vec<(String, String)>,
    max_concurrent_per_host: usize,
    circuit_breaker_failure_threshold: Option<u32>,
    circuit_breaker_cooldown: Duration,
    estimator_timeout: Duration,
    tracking_params: Vec<String>,
    allow_subdomains: bool,
    allow_external_domains: bool,
    allowed_domains: Option<Vec<String>>,
    excluded_patterns: Option<Vec<String>>,
    skip_similar_paths: bool,
    max_links_per_page: usize,
    cancel_grace_period: Duration,
    host_step_ceiling: Option<u32>,
}

impl Default for ConfigDraft {
    fn default() -> Self {
        Self {
            base_url: None,
            goal: None,
            max_pages: DEFAULT_MAX_PAGES,
            max_depth: DEFAULT_MAX_DEPTH,
            max_steps: DEFAULT_MAX_STEPS,
            max_wall_clock: DEFAULT_MAX_WALL_CLOCK,
            min_expected_value_to_enqueue: DEFAULT_MIN_EXPECTED_VALUE,
            concurrency: DEFAULT_CONCURRENCY,
            min_pages_before_goal_check: DEFAULT_MIN_PAGES_BEFORE_GOAL_CHECK,
            volume_cap_pages: DEFAULT_VOLUME_CAP_PAGES,
            diminishing_returns_window: DEFAULT_DIMINISHING_WINDOW,
            diminishing_returns_threshold: DEFAULT_DIMINISHING_THRESHOLD,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_fetch_retries: DEFAULT_MAX_FETCH_RETRIES,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
            retry_max_delay: DEFAULT_RETRY_MAX_DELAY,
            use_js: false,
            request_headers: Vec::new(),
            max_concurrent_per_host: DEFAULT_MAX_CONCURRENT_PER_HOST,
            circuit_breaker_failure_threshold: Some(DEFAULT_CIRCUIT_BREAKER_THRESHOLD),
            circuit_breaker_cooldown: DEFAULT_CIRCUIT_BREAKER_COOLDOWN,
            estimator_timeout: DEFAULT_ESTIMATOR_TIMEOUT,
            tracking_params: DEFAULT_TRACKING_PARAMS
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
            allow_subdomains: false,
            allow_external_domains: false,
            allowed_domains: None,
            excluded_patterns: None,
            skip_similar_paths: false,
            max_links_per_page: DEFAULT_MAX_LINKS_PER_PAGE,
            cancel_grace_period: DEFAULT_CANCEL_GRACE_PERIOD,
            host_step_ceiling: None,
        }
    }
}

pub struct CrawlConfigBuilder<State = ()> {
    pub(crate) draft: ConfigDraft,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for CrawlConfigBuilder<()> {
    fn default() -> Self {
        Self {
            draft: ConfigDraft::default(),
            _phantom: PhantomData,
        }
    }
}

impl CrawlConfig {
    /// Create a builder for configuring a `CrawlConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> CrawlConfigBuilder<()> {
        CrawlConfigBuilder::default()
    }
}

impl<S> CrawlConfigBuilder<S> {
    fn transition<T>(self) -> CrawlConfigBuilder<T> {
        CrawlConfigBuilder {
            draft: self.draft,
            _phantom: PhantomData,
        }
    }
}

impl CrawlConfigBuilder<()> {
    pub fn base_url(mut self, url: impl Into<String>) -> CrawlConfigBuilder<WithBaseUrl> {
        self.draft.base_url = Some(url.into());
        self.transition()
    }
}

impl CrawlConfigBuilder<WithBaseUrl> {
    pub fn goal(mut self, goal: impl Into<String>) -> CrawlConfigBuilder<WithGoal> {
        self.draft.goal = Some(goal.into());
        self.transition()
    }
}

impl<S> CrawlConfigBuilder<S> {
    #[must_use]
    pub fn max_pages(mut self, max_pages: usize) -> Self {
        self.draft.max_pages = max_pages;
        self
    }

    #[must_use]
    pub fn max_depth(mut self, max_depth: u32) -> Self {
        self.draft.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn max_steps(mut self, max_steps: u32) -> Self {
        self.draft.max_steps = max_steps;
        self
    }

    #[must_use]
    pub fn max_wall_clock(mut self, budget: Duration) -> Self {
        self.draft.max_wall_clock = budget;
        self
    }

    #[must_use]
    pub fn min_expected_value_to_enqueue(mut self, threshold: f64) -> Self {
        self.draft.min_expected_value_to_enqueue = threshold;
        self
    }

    #[must_use]
    pub fn concurrency(mut self, workers: usize) -> Self {
        self.draft.concurrency = workers;
        self
    }

    #[must_use]
    pub fn min_pages_before_goal_check(mut self, pages: usize) -> Self {
        self.draft.min_pages_before_goal_check = pages;
        self
    }

    #[must_use]
    pub fn volume_cap_pages(mut self, pages: usize) -> Self {
        self.draft.volume_cap_pages = pages;
        self
    }

    #[must_use]
    pub fn diminishing_returns(mut self, window: usize, threshold: f64) -> Self {
        self.draft.diminishing_returns_window = window;
        self.draft.diminishing_returns_threshold = threshold;
        self
    }

    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.draft.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn max_fetch_retries(mut self, retries: u32) -> Self {
        self.draft.max_fetch_retries = retries;
        self
    }

    #[must_use]
    pub fn retry_delays(mut self, base: Duration, max: Duration) -> Self {
        self.draft.retry_base_delay = base;
        self.draft.retry_max_delay = max;
        self
    }

    #[must_use]
    pub fn use_js(mut self, use_js: bool) -> Self {
        self.draft.use_js = use_js;
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.draft.request_headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn max_concurrent_per_host(mut self, limit: usize) -> Self {
        self.draft.max_concurrent_per_host = limit;
        self
    }

    /// `None` disables the host circuit breaker.
    #[must_use]
    pub fn circuit_breaker(mut self, failure_threshold: Option<u32>, cooldown: Duration) -> Self {
        self.draft.circuit_breaker_failure_threshold = failure_threshold;
        self.draft.circuit_breaker_cooldown = cooldown;
        self
    }

    #[must_use]
    pub fn estimator_timeout(mut self, timeout: Duration) -> Self {
        self.draft.estimator_timeout = timeout;
        self
    }

    /// Replace the tracking-parameter deny-list. `utm_*` is always stripped.
    #[must_use]
    pub fn tracking_params<I, T>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.draft.tracking_params = params.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn allow_subdomains(mut self, allow: bool) -> Self {
        self.draft.allow_subdomains = allow;
        self
    }

    #[must_use]
    pub fn allow_external_domains(mut self, allow: bool) -> Self {
        self.draft.allow_external_domains = allow;
        self
    }

    #[must_use]
    pub fn allowed_domains(mut self, domains: Vec<String>) -> Self {
        self.draft.allowed_domains = Some(domains);
        self
    }

    #[must_use]
    pub fn excluded_patterns(mut self, patterns: Vec<String>) -> Self {
        self.draft.excluded_patterns = Some(patterns);
        self
    }

    /// Skip links whose host+path was already enqueued or visited.
    #[must_use]
    pub fn skip_similar_paths(mut self, skip: bool) -> Self {
        self.draft.skip_similar_paths = skip;
        self
    }

    #[must_use]
    pub fn max_links_per_page(mut self, limit: usize) -> Self {
        self.draft.max_links_per_page = limit;
        self
    }

    #[must_use]
    pub fn cancel_grace_period(mut self, grace: Duration) -> Self {
        self.draft.cancel_grace_period = grace;
        self
    }

    /// Execution ceiling imposed by the host; `max_steps` must stay below it.
    #[must_use]
    pub fn host_step_ceiling(mut self, ceiling: u32) -> Self {
        self.draft.host_step_ceiling = Some(ceiling);
        self
    }
}

impl CrawlConfigBuilder<WithGoal> {
    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Config`] for a malformed base URL, an empty
    /// goal, zero budgets, out-of-range thresholds, an invalid exclusion
    /// glob, or a step budget that reaches the host ceiling.
    pub fn build(self) -> CrawlResult<CrawlConfig> {
        let d = self.draft;

        let canonicalizer = Canonicalizer::new(&d.tracking_params);
        let raw_base = d.base_url.unwrap_or_default();
        let base_url = canonicalizer
            .canonicalize(&raw_base, None)
            .map_err(|e| CrawlError::Config(format!("base_url: {e}")))?;

        let goal = d.goal.unwrap_or_default().trim().to_string();
        if goal.is_empty() {
            return Err(CrawlError::Config("goal must not be empty".into()));
        }

        require_positive("max_pages", d.max_pages)?;
        require_positive("max_steps", d.max_steps as usize)?;
        require_positive("concurrency", d.concurrency)?;
        require_positive("max_concurrent_per_host", d.max_concurrent_per_host)?;
        require_positive("volume_cap_pages", d.volume_cap_pages)?;
        require_positive("diminishing_returns_window", d.diminishing_returns_window)?;
        if d.max_wall_clock.is_zero() {
            return Err(CrawlError::Config("max_wall_clock must be positive".into()));
        }
        if d.request_timeout.is_zero() || d.estimator_timeout.is_zero() {
            return Err(CrawlError::Config(
                "request_timeout and estimator_timeout must be positive".into(),
            ));
        }
        require_unit("min_expected_value_to_enqueue", d.min_expected_value_to_enqueue)?;
        require_unit("diminishing_returns_threshold", d.diminishing_returns_threshold)?;
        if d.circuit_breaker_failure_threshold == Some(0) {
            return Err(CrawlError::Config(
                "circuit_breaker_failure_threshold must be positive (use None to disable)".into(),
            ));
        }
        if let Some(ceiling) = d.host_step_ceiling
            && d.max_steps >= ceiling
        {
            return Err(CrawlError::Config(format!(
                "max_steps ({}) must be strictly below the host step ceiling ({ceiling})",
                d.max_steps
            )));
        }

        let excluded_patterns_compiled = d
            .excluded_patterns
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|p| compile_glob_pattern(p))
            .collect::<CrawlResult<Vec<_>>>()?;

        Ok(CrawlConfig {
            base_url,
            goal,
            limits: Limits {
                max_pages: d.max_pages,
                max_depth: d.max_depth,
                max_steps: d.max_steps,
                max_wall_clock: d.max_wall_clock,
                min_expected_value_to_enqueue: d.min_expected_value_to_enqueue,
            },
            concurrency: d.concurrency,
            min_pages_before_goal_check: d.min_pages_before_goal_check,
            volume_cap_pages: d.volume_cap_pages,
            diminishing_returns_window: d.diminishing_returns_window,
            diminishing_returns_threshold: d.diminishing_returns_threshold,
            request_timeout: d.request_timeout,
            max_fetch_retries: d.max_fetch_retries,
            retry_base_delay: d.retry_base_delay,
            retry_max_delay: d.retry_max_delay.max(d.retry_base_delay),
            use_js: d.use_js,
            request_headers: d.request_headers,
            max_concurrent_per_host: d.max_concurrent_per_host,
            circuit_breaker_failure_threshold: d.circuit_breaker_failure_threshold,
            circuit_breaker_cooldown: d.circuit_breaker_cooldown,
            estimator_timeout: d.estimator_timeout,
            canonicalizer,
            allow_subdomains: d.allow_subdomains,
            allow_external_domains: d.allow_external_domains,
            allowed_domains: d.allowed_domains,
            excluded_patterns: d.excluded_patterns,
            excluded_patterns_compiled,
            skip_similar_paths: d.skip_similar_paths,
            max_links_per_page: d.max_links_per_page,
            cancel_grace_period: d.cancel_grace_period,
            host_step_ceiling: d.host_step_ceiling,
        })
    }
}

fn require_positive(name: &str, value: usize) -> CrawlResult<()> {
    if value == 0 {
        return Err(CrawlError::Config(format!("{name} must be positive")));
    }
    Ok(())
}

fn require_unit(name: &str, value: f64) -> CrawlResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(CrawlError::Config(format!(
            "{name} must be within [0, 1], got {value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> CrawlConfigBuilder<WithGoal> {
        CrawlConfig::builder()
            .base_url("https://Docs.Example.com/start?utm_source=x#top")
            .goal("find the rust async runtime guide")
    }

    #[test]
    fn defaults_are_applied() {
        let config = base().build().expect("valid config");
        assert_eq!(config.base_url().as_str(), "https://docs.example.com/start");
        assert_eq!(config.limits().max_pages, DEFAULT_MAX_PAGES);
        assert_eq!(config.concurrency(), 1);
        assert_eq!(config.min_pages_before_goal_check(), 3);
        assert!(!config.skip_similar_paths());
        assert_eq!(config.max_fetch_retries(), 3);
    }

    #[test]
    fn setters_work_in_any_state() {
        let config = CrawlConfig::builder()
            .max_pages(7)
            .base_url("https://example.com")
            .concurrency(4)
            .goal("g")
            .max_steps(20)
            .build()
            .expect("valid config");
        assert_eq!(config.limits().max_pages, 7);
        assert_eq!(config.limits().max_steps, 20);
        assert_eq!(config.concurrency(), 4);
    }

    #[test]
    fn rejects_bad_inputs() {
        let bad_url = CrawlConfig::builder().base_url("ftp://x").goal("g").build();
        assert!(matches!(bad_url, Err(CrawlError::Config(_))));

        let empty_goal = CrawlConfig::builder()
            .base_url("https://example.com")
            .goal("   ")
            .build();
        assert!(matches!(empty_goal, Err(CrawlError::Config(_))));

        assert!(base().max_pages(0).build().is_err());
        assert!(base().max_steps(0).build().is_err());
        assert!(base().concurrency(0).build().is_err());
        assert!(base().min_expected_value_to_enqueue(1.5).build().is_err());
        assert!(base().max_wall_clock(Duration::ZERO).build().is_err());
    }

    #[test]
    fn step_budget_must_stay_below_host_ceiling() {
        assert!(base().max_steps(25).host_step_ceiling(25).build().is_err());
        assert!(base().max_steps(24).host_step_ceiling(25).build().is_ok());
    }

    #[test]
    fn glob_patterns_compile_once() {
        let config = base()
            .excluded_patterns(vec!["*/login*".into(), "https://example.com/a.b".into()])
            .build()
            .expect("valid globs");
        let compiled = config.excluded_patterns_compiled();
        assert_eq!(compiled.len(), 2);
        assert!(compiled[0].is_match("https://example.com/login?next=/"));
        assert!(!compiled[1].is_match("https://example.com/aXb"));
    }
}
