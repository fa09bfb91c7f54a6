//! Scheduler assembly and the one-call crawl API
//!
//! [`SchedulerBuilder`] wires collaborators into a [`CrawlScheduler`]. Any
//! collaborator left unset gets the reference implementation:
//! `ReqwestFetcher`, `HtmlExtractor`, `KeywordEstimator` and `NoOpSink`.
//! Without an auth provider, authentication challenges fail the URL.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::collaborators::{
    AuthProvider, AuthSession, ContentExtractor, Fetcher, HtmlExtractor, KeywordEstimator,
    LinkExtractor, ReqwestFetcher, ValueEstimator,
};
use crate::config::CrawlConfig;
use crate::crawl_events::{EventSink, NoOpSink};

use super::circuit_breaker::CircuitBreaker;
use super::crawl_types::{CrawlOutput, CrawlResult};
use super::domain_limiter::DomainLimiter;
use super::orchestrator::CrawlScheduler;
use super::page_processor::PagePipeline;

pub struct SchedulerBuilder {
    config: CrawlConfig,
    fetcher: Option<Arc<dyn Fetcher>>,
    content_extractor: Option<Arc<dyn ContentExtractor>>,
    link_extractor: Option<Arc<dyn LinkExtractor>>,
    estimator: Option<Arc<dyn ValueEstimator>>,
    auth: Option<Arc<dyn AuthProvider>>,
    events: Option<Arc<dyn EventSink>>,
}

impl SchedulerBuilder {
    #[must_use]
    pub fn new(config: CrawlConfig) -> Self {
        Self {
            config,
            fetcher: None,
            content_extractor: None,
            link_extractor: None,
            estimator: None,
            auth: None,
            events: None,
        }
    }

    #[must_use]
    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    #[must_use]
    pub fn content_extractor(mut self, extractor: Arc<dyn ContentExtractor>) -> Self {
        self.content_extractor = Some(extractor);
        self
    }

    #[must_use]
    pub fn link_extractor(mut self, extractor: Arc<dyn LinkExtractor>) -> Self {
        self.link_extractor = Some(extractor);
        self
    }

    #[must_use]
    pub fn estimator(mut self, estimator: Arc<dyn ValueEstimator>) -> Self {
        self.estimator = Some(estimator);
        self
    }

    #[must_use]
    pub fn auth_provider(mut self, provider: Arc<dyn AuthProvider>) -> Self {
        self.auth = Some(provider);
        self
    }

    #[must_use]
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = Some(sink);
        self
    }

    /// # Errors
    ///
    /// Returns [`CrawlError::Config`](super::crawl_types::CrawlError::Config)
    /// if the default HTTP client cannot be built.
    pub fn build(self) -> CrawlResult<CrawlScheduler> {
        let fetcher: Arc<dyn Fetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(ReqwestFetcher::new()?),
        };
        let config = Arc::new(self.config);

        let circuit_breaker = config
            .circuit_breaker_failure_threshold()
            .map(|threshold| {
                Arc::new(CircuitBreaker::new(
                    threshold,
                    config.circuit_breaker_cooldown(),
                ))
            });

        let content_extractor: Arc<dyn ContentExtractor> = match self.content_extractor {
            Some(extractor) => extractor,
            None => Arc::new(HtmlExtractor),
        };
        let link_extractor: Arc<dyn LinkExtractor> = match self.link_extractor {
            Some(extractor) => extractor,
            None => Arc::new(HtmlExtractor),
        };
        let estimator: Arc<dyn ValueEstimator> = match self.estimator {
            Some(estimator) => estimator,
            None => Arc::new(KeywordEstimator::new()),
        };
        let events: Arc<dyn EventSink> = match self.events {
            Some(sink) => sink,
            None => Arc::new(NoOpSink),
        };

        let pipeline = PagePipeline {
            fetcher,
            content_extractor,
            link_extractor,
            estimator,
            circuit_breaker,
            domain_limiter: Arc::new(DomainLimiter::new(config.max_concurrent_per_host())),
            session: Arc::new(AuthSession::new()),
            retry: PagePipeline::retry_config(&config),
            config: Arc::clone(&config),
        };

        Ok(CrawlScheduler {
            config,
            pipeline,
            auth: self.auth,
            events,
        })
    }
}

/// Run a crawl with the reference collaborators and no cancellation.
///
/// # Errors
///
/// Only setup can fail; once the run starts the output is always returned.
pub async fn crawl(config: CrawlConfig) -> CrawlResult<CrawlOutput> {
    let scheduler = SchedulerBuilder::new(config).build()?;
    Ok(scheduler.run(CancellationToken::new()).await)
}
