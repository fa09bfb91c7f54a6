//! Single page processing logic
//!
//! Handles the complete lifecycle of one frontier entry:
//! - Circuit breaker and per-host permit
//! - Fetch with timeout, retry and status validation
//! - Content and link extraction
//! - Content and link scoring under the estimator budget
//!
//! The pipeline never touches the run state. It hands a finished
//! [`PageRecord`] and the scored outbound links back to the scheduler.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use futures::stream;
use log::{debug, info, trace, warn};

use crate::canonical_url::CanonicalUrl;
use crate::collaborators::{
    AuthSession, ContentExtractor, FetchOptions, FetchResponse, Fetcher, LinkExtractor, RawLink,
    ValueEstimator,
};
use crate::config::CrawlConfig;
use crate::frontier::FrontierEntry;
use crate::utils::NEUTRAL_SCORE;

use super::circuit_breaker::CircuitBreaker;
use super::content_validator::validate_page_content;
use super::crawl_types::{
    CrawlError, CrawlResult, ExtractionOutcome, LinkCandidate, Metrics, PageRecord, clamp_unit,
};
use super::domain_limiter::DomainLimiter;
use super::goal::Goal;
use super::link_filter::should_visit_url;
use super::page_timeout::{with_estimator_timeout, with_page_timeout};
use super::retry::{RetryConfig, retry_with_backoff};

/// Concurrent link scoring calls per page
const LINK_SCORING_CONCURRENCY: usize = 8;

/// Everything a worker needs to turn a frontier entry into a page record
#[derive(Clone)]
pub struct PagePipeline {
    pub config: Arc<CrawlConfig>,
    pub fetcher: Arc<dyn Fetcher>,
    pub content_extractor: Arc<dyn ContentExtractor>,
    pub link_extractor: Arc<dyn LinkExtractor>,
    pub estimator: Arc<dyn ValueEstimator>,
    pub circuit_breaker: Option<Arc<CircuitBreaker>>,
    pub domain_limiter: Arc<DomainLimiter>,
    pub session: Arc<AuthSession>,
    pub retry: RetryConfig,
}

impl PagePipeline {
    /// Retry policy derived from the run configuration
    #[must_use]
    pub fn retry_config(config: &CrawlConfig) -> RetryConfig {
        RetryConfig {
            max_retries: config.max_fetch_retries(),
            initial_delay: config.retry_base_delay(),
            max_delay: config.retry_max_delay(),
            ..RetryConfig::default()
        }
    }

    /// Copy of the pipeline for one run, with run-scoped estimator state.
    #[must_use]
    pub fn for_run(&self) -> Self {
        let mut pipeline = self.clone();
        if let Some(estimator) = self.estimator.for_run() {
            pipeline.estimator = estimator;
        }
        pipeline
    }

    /// Fetch, extract and score one page.
    ///
    /// # Errors
    ///
    /// Fetch failures after retries, an open host circuit, and
    /// `AuthenticationRequired` (returned untouched for the worker to
    /// escalate). Estimator trouble never fails the page.
    pub async fn process(
        &self,
        entry: &FrontierEntry,
        goal: &Goal,
    ) -> CrawlResult<(PageRecord, Vec<LinkCandidate>)> {
        let url = &entry.url;
        let host = url.host().to_string();

        if let Some(cb) = &self.circuit_breaker
            && !cb.should_attempt(&host)
        {
            debug!(target: "goalscrape::pipeline", "Circuit breaker OPEN, skipping: {url}");
            return Err(CrawlError::FetchFatal {
                url: url.to_string(),
                reason: format!("circuit open for host {host}"),
                status: None,
            });
        }

        let _host_permit = self.domain_limiter.acquire(&host).await?;

        info!(target: "goalscrape::pipeline", "Crawling [depth {}]: {url}", entry.depth);

        let response = match self.fetch_with_retry(url).await {
            Ok(response) => {
                if let Some(cb) = &self.circuit_breaker {
                    cb.record_success(&host);
                }
                response
            }
            Err(e) => {
                if let Some(cb) = &self.circuit_breaker
                    && !matches!(e, CrawlError::AuthenticationRequired { .. })
                {
                    cb.record_failure(&host, &e.to_string());
                }
                return Err(e);
            }
        };

        let extracted = self.content_extractor.extract(&response.html, url);
        let raw_links = self.link_extractor.extract_links(&response.html, url);

        let (outcome, metrics, metrics_defaulted) = if extracted.text.trim().is_empty() {
            debug!(target: "goalscrape::pipeline", "No extractable text on {url}");
            (ExtractionOutcome::Empty, Metrics::zero(), false)
        } else {
            let scored = with_estimator_timeout(
                self.estimator.score_content(&extracted.text, goal),
                self.config.estimator_timeout(),
            )
            .await;
            match scored {
                Ok(metrics) => (ExtractionOutcome::Extracted, metrics.clamped(), false),
                Err(e) => {
                    warn!(
                        target: "goalscrape::pipeline",
                        "Content scoring failed for {url}, using neutral metrics: {e}"
                    );
                    (ExtractionOutcome::Extracted, Metrics::neutral(), true)
                }
            }
        };

        let candidates = self.prepare_links(url, raw_links);
        let links = self.score_links(candidates, goal).await;

        let record = PageRecord {
            url: url.clone(),
            depth: entry.depth,
            status: response.status,
            title: extracted.title,
            content: extracted.text,
            content_type: extracted.content_type,
            extraction_timestamp: Utc::now(),
            outcome,
            metrics,
            metrics_defaulted,
            outbound_links: links.clone(),
            entities: extracted.entities,
        };

        Ok((record, links))
    }

    async fn fetch_with_retry(&self, url: &CanonicalUrl) -> CrawlResult<FetchResponse> {
        let mut headers = self.config.request_headers().to_vec();
        headers.extend(self.session.headers());
        let options = FetchOptions {
            use_js: self.config.use_js(),
            timeout: self.config.request_timeout(),
            headers,
        };

        let fetcher = &self.fetcher;
        let options = &options;
        retry_with_backoff(&self.retry, move |attempt| async move {
            if attempt > 0 {
                debug!(target: "goalscrape::pipeline", "Retry {attempt} for {url}");
            }
            let response =
                with_page_timeout(fetcher.fetch(url, options), options.timeout, url.as_str())
                    .await?;
            validate_page_content(url.as_str(), Some(response.status))
                .into_result(url.as_str(), None)?;
            Ok(response)
        })
        .await
    }

    /// Canonicalize, scope-filter, dedup and cap raw links.
    fn prepare_links(&self, page_url: &CanonicalUrl, raw_links: Vec<RawLink>) -> Vec<LinkCandidate> {
        let canonicalizer = self.config.canonicalizer();
        let max_links = self.config.max_links_per_page();
        let mut seen: HashSet<CanonicalUrl> = HashSet::new();
        let mut candidates = Vec::new();

        for raw in raw_links {
            if candidates.len() >= max_links {
                trace!(
                    target: "goalscrape::pipeline",
                    "Link cap {max_links} reached on {page_url}"
                );
                break;
            }
            let url = match canonicalizer.canonicalize(&raw.href, Some(page_url)) {
                Ok(url) => url,
                Err(e) => {
                    trace!(target: "goalscrape::pipeline", "Dropping link: {e}");
                    continue;
                }
            };
            if &url == page_url || !should_visit_url(&url, &self.config) {
                continue;
            }
            if !seen.insert(url.clone()) {
                continue;
            }
            candidates.push(LinkCandidate {
                url,
                anchor_text: raw.anchor_text,
                surrounding_context: raw.context,
                predicted_value: NEUTRAL_SCORE,
            });
        }
        candidates
    }

    async fn score_links(&self, candidates: Vec<LinkCandidate>, goal: &Goal) -> Vec<LinkCandidate> {
        let timeout = self.config.estimator_timeout();
        let estimator = &self.estimator;

        stream::iter(candidates)
            .map(|mut link| async move {
                match with_estimator_timeout(estimator.score_link(&link, goal), timeout).await {
                    Ok(value) => link.predicted_value = clamp_unit(value),
                    Err(e) => {
                        trace!(
                            target: "goalscrape::pipeline",
                            "Link scoring failed for {}, neutral: {e}",
                            link.url
                        );
                        link.predicted_value = NEUTRAL_SCORE;
                    }
                }
                link
            })
            .buffered(LINK_SCORING_CONCURRENCY)
            .collect()
            .await
    }
}

impl std::fmt::Debug for PagePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PagePipeline")
            .field("base_url", self.config.base_url())
            .field("circuit_breaker", &self.circuit_breaker.is_some())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{FetchResponse, HtmlExtractor, KeywordEstimator};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    struct FlakyFetcher {
        calls: AtomicU32,
        failures_before_success: u32,
        html: &'static str,
    }

    #[async_trait]
    impl Fetcher for FlakyFetcher {
        async fn fetch(&self, url: &CanonicalUrl, _: &FetchOptions) -> CrawlResult<FetchResponse> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures_before_success {
                return Err(CrawlError::FetchTransient {
                    url: url.to_string(),
                    reason: "connection reset".into(),
                    status: None,
                });
            }
            Ok(FetchResponse {
                html: self.html.to_string(),
                status: 200,
                headers: Vec::new(),
            })
        }
    }

    struct FailingEstimator;

    #[async_trait]
    impl ValueEstimator for FailingEstimator {
        async fn score_content(&self, _: &str, _: &Goal) -> CrawlResult<Metrics> {
            Err(CrawlError::Estimator("model unavailable".into()))
        }
        async fn score_link(&self, _: &LinkCandidate, _: &Goal) -> CrawlResult<f64> {
            Err(CrawlError::Estimator("model unavailable".into()))
        }
    }

    const PAGE: &str = r#"<html><head><title>Guide</title></head><body>
        <p>Async runtime guide.</p>
        <a href="/a">A</a><a href="/a#x">A again</a><a href="https://other.org/">ext</a>
        <a href="/">self</a><a href="mailto:x@y.z">mail</a>
    </body></html>"#;

    fn pipeline(fetcher: Arc<dyn Fetcher>, estimator: Arc<dyn ValueEstimator>) -> PagePipeline {
        let config = CrawlConfig::builder()
            .base_url("https://example.com/")
            .goal("async runtime")
            .retry_delays(Duration::from_millis(1), Duration::from_millis(2))
            .build()
            .expect("config");
        let retry = PagePipeline::retry_config(&config);
        PagePipeline {
            fetcher,
            content_extractor: Arc::new(HtmlExtractor),
            link_extractor: Arc::new(HtmlExtractor),
            estimator,
            circuit_breaker: Some(Arc::new(CircuitBreaker::new(5, Duration::from_secs(60)))),
            domain_limiter: Arc::new(DomainLimiter::new(config.max_concurrent_per_host())),
            session: Arc::new(AuthSession::new()),
            retry,
            config: Arc::new(config),
        }
    }

    fn entry() -> FrontierEntry {
        let url = crate::canonical_url::Canonicalizer::default()
            .canonicalize("https://example.com/", None)
            .expect("url");
        FrontierEntry::new(url, 0, 1.0)
    }

    #[tokio::test]
    async fn retries_transient_then_extracts() {
        let fetcher = Arc::new(FlakyFetcher {
            calls: AtomicU32::new(0),
            failures_before_success: 2,
            html: PAGE,
        });
        let p = pipeline(fetcher.clone(), Arc::new(KeywordEstimator::new()));
        let (record, links) = p.process(&entry(), &Goal::new("async runtime")).await.expect("page");

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
        assert_eq!(record.title, "Guide");
        assert_eq!(record.outcome, ExtractionOutcome::Extracted);
        assert!(!record.metrics_defaulted);
        // Fragment duplicate, external, self and mailto links are dropped.
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url.as_str(), "https://example.com/a");
    }

    #[tokio::test]
    async fn exhausted_retries_are_fatal() {
        let fetcher = Arc::new(FlakyFetcher {
            calls: AtomicU32::new(0),
            failures_before_success: u32::MAX,
            html: PAGE,
        });
        let p = pipeline(fetcher.clone(), Arc::new(KeywordEstimator::new()));
        let err = p.process(&entry(), &Goal::new("x")).await.expect_err("fatal");

        assert!(matches!(err, CrawlError::FetchFatal { .. }));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn estimator_failure_defaults_to_neutral() {
        let fetcher = Arc::new(FlakyFetcher {
            calls: AtomicU32::new(0),
            failures_before_success: 0,
            html: PAGE,
        });
        let p = pipeline(fetcher, Arc::new(FailingEstimator));
        let (record, links) = p.process(&entry(), &Goal::new("async")).await.expect("page");

        assert!(record.metrics_defaulted);
        assert_eq!(record.metrics, Metrics::neutral());
        assert!(links.iter().all(|l| l.predicted_value == NEUTRAL_SCORE));
    }

    #[tokio::test]
    async fn empty_page_gets_zero_metrics() {
        let fetcher = Arc::new(FlakyFetcher {
            calls: AtomicU32::new(0),
            failures_before_success: 0,
            html: "<html><body><script>var x = 1;</script></body></html>",
        });
        let p = pipeline(fetcher, Arc::new(KeywordEstimator::new()));
        let (record, _) = p.process(&entry(), &Goal::new("async")).await.expect("page");

        assert_eq!(record.outcome, ExtractionOutcome::Empty);
        assert_eq!(record.metrics, Metrics::zero());
    }
}
