//! Crawl Engine Module
//!
//! The scheduler loop, the per-page pipeline and the pieces they are built
//! from: decision engine, progress evaluator, run state, retry, timeouts,
//! host circuit breaker and per-host limiter.

pub mod circuit_breaker;
pub mod content_validator;
pub mod crawl_types;
pub mod decision;
pub mod domain_limiter;
pub mod evaluator;
pub mod execution;
pub mod goal;
pub mod link_filter;
pub mod orchestrator;
pub mod page_processor;
pub mod page_timeout;
pub mod retry;
pub mod run_state;

pub use execution::{SchedulerBuilder, crawl};
pub use orchestrator::CrawlScheduler;

pub use circuit_breaker::{CircuitBreaker, CircuitState, HostHealth};
pub use content_validator::{ContentValidationResult, validate_page_content};
pub use crawl_types::{
    CrawlError, CrawlOutput, CrawlResult, EntityMention, ExtractionOutcome, FailureKind,
    FailureRecord, LinkCandidate, Metrics, PageRecord, RunSummary,
};
pub use decision::{CompletionReason, Decision, DecisionEngine, NavigationAction, NavigationState};
pub use domain_limiter::DomainLimiter;
pub use evaluator::{ProgressEvaluator, ProgressMetrics, keyword_coverage};
pub use goal::Goal;
pub use link_filter::{SimilarPathFilter, path_signature, should_visit_url};
pub use page_processor::PagePipeline;
pub use retry::{RetryConfig, retry_with_backoff};
pub use run_state::{CommitSummary, EnqueueOutcome, RunSnapshot, RunState};
