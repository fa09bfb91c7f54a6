//! Goal-directed, budget-bounded web crawl scheduler.
//!
//! A run keeps a prioritized frontier of canonical URLs, fetches the most
//! promising ones through pluggable collaborators, and stops once the goal
//! looks satisfied, returns diminish, or a budget runs out.

pub mod canonical_url;
pub mod collaborators;
pub mod config;
pub mod crawl_engine;
pub mod crawl_events;
pub mod frontier;
pub mod ledger;
pub mod utils;

pub use canonical_url::{CanonicalUrl, Canonicalizer};
pub use collaborators::{
    AuthProvider, ContentExtractor, FetchOptions, FetchResponse, Fetcher, HtmlExtractor,
    KeywordEstimator, LinkExtractor, RawLink, ReqwestFetcher, SessionArtifacts,
    StaticCredentialProvider, ValueEstimator,
};
pub use config::{CrawlConfig, Limits};
pub use crawl_engine::{
    CompletionReason, CrawlError, CrawlOutput, CrawlResult, CrawlScheduler, FailureRecord, Goal,
    LinkCandidate, Metrics, PageRecord, RunSummary, SchedulerBuilder, crawl,
};
pub use crawl_events::{CrawlEvent, CrawlEventBus, EventSink, LogSink, NoOpSink};
pub use frontier::{Frontier, FrontierEntry, PushOutcome};
pub use ledger::{Partition, VisitedLedger};

pub use tokio_util::sync::CancellationToken;
