//! Core types for crawl operations.
//!
//! This module contains the error taxonomy, the page/link records produced by
//! the pipeline, and the final run output.

use std::time::Duration;

use serde::Serialize;

use crate::canonical_url::CanonicalUrl;

use super::decision::CompletionReason;

/// Error type for crawl operations
///
/// Only [`CrawlError::Config`] aborts a run. Everything else is scoped to a
/// single URL or a single estimator call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CrawlError {
    /// Unparsable URL, unsupported scheme or missing host
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Retryable fetch failure (timeout, connection reset, 429, 5xx)
    #[error("Transient fetch failure for {url}: {reason}")]
    FetchTransient {
        url: String,
        reason: String,
        status: Option<u16>,
    },

    /// Permanent fetch failure, or transient retries exhausted
    #[error("Fatal fetch failure for {url}: {reason}")]
    FetchFatal {
        url: String,
        reason: String,
        status: Option<u16>,
    },

    /// The origin demands credentials
    #[error("Authentication required for {url} ({challenge_type})")]
    AuthenticationRequired { url: String, challenge_type: String },

    /// Estimator did not answer within its budget
    #[error("Value estimator timed out after {0:?}")]
    EstimatorTimeout(Duration),

    /// Estimator answered with an error
    #[error("Value estimator error: {0}")]
    Estimator(String),

    /// Invalid run configuration, detected before the first fetch
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation cancelled
    #[error("Crawl operation was cancelled")]
    Cancelled,
}

impl CrawlError {
    /// Short stable label used in failure records and events.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidUrl { .. } => "invalid-url",
            Self::FetchTransient { .. } => "fetch-transient",
            Self::FetchFatal { .. } => "fetch-fatal",
            Self::AuthenticationRequired { .. } => "authentication-required",
            Self::EstimatorTimeout(_) => "estimator-timeout",
            Self::Estimator(_) => "estimator",
            Self::Config(_) => "config",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether a fetch that failed with this error may be tried again.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::FetchTransient { .. })
    }

    /// Convert a transient failure into its terminal form once retries run out.
    #[must_use]
    pub fn into_fatal(self, attempts: u32) -> Self {
        match self {
            Self::FetchTransient {
                url,
                reason,
                status,
            } => Self::FetchFatal {
                url,
                reason: format!("{reason} (gave up after {attempts} attempts)"),
                status,
            },
            other => other,
        }
    }
}

impl From<anyhow::Error> for CrawlError {
    fn from(err: anyhow::Error) -> Self {
        Self::Config(format!("{err:#}"))
    }
}

/// Convenience alias for Result with `CrawlError`
pub type CrawlResult<T> = Result<T, CrawlError>;

/// Categorizes fetch failures for retry decisions
///
/// Rate limiting backs off longer than plain network trouble; client errors
/// are never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    /// Timeout, DNS, connection refused/reset
    Network,
    /// HTTP 429 or an explicit rate-limit message
    RateLimited,
    /// HTTP 5xx or 408/425
    Server,
    /// HTTP 4xx other than the cases above
    Client,
    /// HTTP 401/407
    Auth,
    Unknown,
}

impl FailureKind {
    /// Classify an HTTP status code.
    #[must_use]
    pub const fn from_status(status: u16) -> Option<Self> {
        match status {
            401 | 407 => Some(Self::Auth),
            429 => Some(Self::RateLimited),
            408 | 425 | 500..=599 => Some(Self::Server),
            400..=499 => Some(Self::Client),
            _ => None,
        }
    }

    /// Classify a transport error message.
    #[must_use]
    pub fn classify_message(message: &str) -> Self {
        let msg = message.to_lowercase();

        if msg.contains("429") || msg.contains("too many requests") || msg.contains("rate limit")
        {
            return Self::RateLimited;
        }

        if msg.contains("timeout")
            || msg.contains("timed out")
            || msg.contains("connection refused")
            || msg.contains("connection reset")
            || msg.contains("dns")
            || msg.contains("unreachable")
            || msg.contains("eof")
        {
            return Self::Network;
        }

        Self::Unknown
    }

    /// Whether this failure kind should be retried
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Network | Self::RateLimited | Self::Server => true,
            Self::Client | Self::Auth | Self::Unknown => false,
        }
    }

    /// Base delay multiplier for this failure kind
    #[must_use]
    pub const fn delay_multiplier(&self) -> f64 {
        match self {
            Self::RateLimited => 3.0,
            Self::Server => 1.5,
            Self::Network | Self::Client | Self::Auth | Self::Unknown => 1.0,
        }
    }
}

/// Per-page value scores, each in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Metrics {
    pub information_density: f64,
    pub relevance: f64,
    pub uniqueness: f64,
}

impl Metrics {
    /// All three scores at `v`, clamped.
    #[must_use]
    pub fn uniform(v: f64) -> Self {
        Self {
            information_density: v,
            relevance: v,
            uniqueness: v,
        }
        .clamped()
    }

    #[must_use]
    pub fn neutral() -> Self {
        Self::uniform(crate::utils::NEUTRAL_SCORE)
    }

    #[must_use]
    pub fn zero() -> Self {
        Self::uniform(0.0)
    }

    /// Clamp every score into `[0, 1]`, mapping non-finite values to 0.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            information_density: clamp_unit(self.information_density),
            relevance: clamp_unit(self.relevance),
            uniqueness: clamp_unit(self.uniqueness),
        }
    }
}

/// Clamp into `[0, 1]`; NaN and infinities become 0.
#[inline]
#[must_use]
pub fn clamp_unit(v: f64) -> f64 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 }
}

/// Named entity surfaced by the content extractor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityMention {
    pub name: String,
    pub kind: String,
}

/// Outbound link discovered on a page, scored for the frontier
#[derive(Debug, Clone, Serialize)]
pub struct LinkCandidate {
    pub url: CanonicalUrl,
    pub anchor_text: String,
    pub surrounding_context: String,
    pub predicted_value: f64,
}

/// Whether extraction produced usable text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionOutcome {
    Extracted,
    /// No text survived extraction; the page scores zero but still counts
    Empty,
}

/// A committed page. Immutable once the scheduler accepts it.
#[derive(Debug, Clone, Serialize)]
pub struct PageRecord {
    pub url: CanonicalUrl,
    pub depth: u32,
    pub status: u16,
    pub title: String,
    pub content: String,
    pub content_type: String,
    pub extraction_timestamp: chrono::DateTime<chrono::Utc>,
    pub outcome: ExtractionOutcome,
    pub metrics: Metrics,
    /// Set when any score fell back to the neutral default
    pub metrics_defaulted: bool,
    pub outbound_links: Vec<LinkCandidate>,
    pub entities: Vec<EntityMention>,
}

impl PageRecord {
    /// Size of the extracted text in bytes
    #[must_use]
    pub fn content_size(&self) -> usize {
        self.content.len()
    }
}

/// A URL that ended in the ledger's failed partition
#[derive(Debug, Clone, Serialize)]
pub struct FailureRecord {
    pub url: CanonicalUrl,
    pub depth: u32,
    pub kind: &'static str,
    pub reason: String,
}

impl FailureRecord {
    #[must_use]
    pub fn new(url: CanonicalUrl, depth: u32, error: &CrawlError) -> Self {
        Self {
            url,
            depth,
            kind: error.kind(),
            reason: error.to_string(),
        }
    }
}

/// Run-level summary attached to every output
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: uuid::Uuid,
    pub pages_scraped: usize,
    pub total_content_size: usize,
    #[serde(serialize_with = "serialize_secs")]
    pub execution_time: Duration,
    pub goal_completion: f64,
    pub coverage_score: f64,
    pub completion_reason: CompletionReason,
    pub steps_taken: u32,
    pub failed_urls: usize,
}

/// Final result of a run. Partial results are always kept.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlOutput {
    pub pages: Vec<PageRecord>,
    pub failures: Vec<FailureRecord>,
    pub summary: RunSummary,
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert_eq!(FailureKind::from_status(401), Some(FailureKind::Auth));
        assert_eq!(FailureKind::from_status(429), Some(FailureKind::RateLimited));
        assert_eq!(FailureKind::from_status(503), Some(FailureKind::Server));
        assert_eq!(FailureKind::from_status(408), Some(FailureKind::Server));
        assert_eq!(FailureKind::from_status(404), Some(FailureKind::Client));
        assert_eq!(FailureKind::from_status(200), None);
        assert!(FailureKind::RateLimited.delay_multiplier() > FailureKind::Network.delay_multiplier());
        assert!(!FailureKind::Client.is_retryable());
    }

    #[test]
    fn message_classification() {
        assert_eq!(
            FailureKind::classify_message("operation timed out"),
            FailureKind::Network
        );
        assert_eq!(
            FailureKind::classify_message("Too Many Requests"),
            FailureKind::RateLimited
        );
        assert_eq!(FailureKind::classify_message("weird"), FailureKind::Unknown);
    }

    #[test]
    fn transient_becomes_fatal() {
        let err = CrawlError::FetchTransient {
            url: "https://e.com/".into(),
            reason: "503".into(),
            status: Some(503),
        };
        assert!(err.is_transient());
        let fatal = err.into_fatal(4);
        assert!(matches!(fatal, CrawlError::FetchFatal { status: Some(503), .. }));
        assert!(fatal.to_string().contains("4 attempts"));
    }

    #[test]
    fn metrics_are_clamped() {
        let m = Metrics {
            information_density: 1.7,
            relevance: f64::NAN,
            uniqueness: -0.2,
        }
        .clamped();
        assert_eq!(m, Metrics::uniform(0.0).with_density(1.0));
    }

    impl Metrics {
        fn with_density(mut self, v: f64) -> Self {
            self.information_density = v;
            self
        }
    }
}
