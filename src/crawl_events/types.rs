//! Event type definitions for the crawl event system
//!
//! Every event carries the run id and a UTC timestamp so subscribers can
//! interleave several runs on one bus.

use serde::Serialize;
use uuid::Uuid;

use crate::crawl_engine::crawl_types::{CrawlError, Metrics, PageRecord, RunSummary};

/// Reason for event bus shutdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ShutdownReason {
    /// Run finished, whatever its completion reason
    CrawlCompleted,
    /// Run aborted with an error
    Error(String),
    /// Run was cancelled by the caller
    Cancelled,
}

/// Events emitted while a run progresses
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CrawlEvent {
    /// Emitted once, before the first fetch
    Started {
        run_id: Uuid,
        base_url: String,
        goal: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    /// Emitted when a page has been committed to the run
    PageProcessed {
        run_id: Uuid,
        url: String,
        depth: u32,
        timestamp: chrono::DateTime<chrono::Utc>,
        metadata: PageProcessedMetadata,
    },
    /// Emitted when a worker escalates to the auth provider
    AuthRequired {
        run_id: Uuid,
        url: String,
        challenge_type: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    /// Emitted once, with the final summary
    Completed {
        run_id: Uuid,
        summary: RunSummary,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    /// A URL ended up in the failed partition
    Error {
        run_id: Uuid,
        url: String,
        kind: &'static str,
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    /// Signals that the event bus is shutting down
    ///
    /// Subscribers should exit their event loops when receiving this event.
    Shutdown {
        reason: ShutdownReason,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

/// What a committed page contributed
#[derive(Debug, Clone, Serialize)]
pub struct PageProcessedMetadata {
    pub title: String,
    pub content_size: usize,
    pub links_found: usize,
    /// Links that actually entered the frontier
    pub links_enqueued: usize,
    pub metrics: Metrics,
    pub metrics_defaulted: bool,
    /// Committed pages including this one
    pub pages_so_far: usize,
}

/// Helper functions for creating common events
impl CrawlEvent {
    #[must_use]
    pub fn started(run_id: Uuid, base_url: impl Into<String>, goal: impl Into<String>) -> Self {
        Self::Started {
            run_id,
            base_url: base_url.into(),
            goal: goal.into(),
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn page_processed(
        run_id: Uuid,
        page: &PageRecord,
        links_enqueued: usize,
        pages_so_far: usize,
    ) -> Self {
        Self::PageProcessed {
            run_id,
            url: page.url.to_string(),
            depth: page.depth,
            timestamp: chrono::Utc::now(),
            metadata: PageProcessedMetadata {
                title: page.title.clone(),
                content_size: page.content_size(),
                links_found: page.outbound_links.len(),
                links_enqueued,
                metrics: page.metrics,
                metrics_defaulted: page.metrics_defaulted,
                pages_so_far,
            },
        }
    }

    #[must_use]
    pub fn auth_required(
        run_id: Uuid,
        url: impl Into<String>,
        challenge_type: impl Into<String>,
    ) -> Self {
        Self::AuthRequired {
            run_id,
            url: url.into(),
            challenge_type: challenge_type.into(),
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn completed(run_id: Uuid, summary: RunSummary) -> Self {
        Self::Completed {
            run_id,
            summary,
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn error(run_id: Uuid, url: impl Into<String>, error: &CrawlError) -> Self {
        Self::Error {
            run_id,
            url: url.into(),
            kind: error.kind(),
            message: error.to_string(),
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn shutdown(reason: ShutdownReason) -> Self {
        Self::Shutdown {
            reason,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Stable wire name of the event type
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::PageProcessed { .. } => "page-processed",
            Self::AuthRequired { .. } => "auth-required",
            Self::Completed { .. } => "completed",
            Self::Error { .. } => "error",
            Self::Shutdown { .. } => "shutdown",
        }
    }

    /// Run the event belongs to; `None` for bus-level events
    #[must_use]
    pub const fn run_id(&self) -> Option<Uuid> {
        match self {
            Self::Started { run_id, .. }
            | Self::PageProcessed { run_id, .. }
            | Self::AuthRequired { run_id, .. }
            | Self::Completed { run_id, .. }
            | Self::Error { run_id, .. } => Some(*run_id),
            Self::Shutdown { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_and_serialized_tag_agree() {
        let run_id = Uuid::new_v4();
        let events = [
            CrawlEvent::started(run_id, "https://e.com/", "goal"),
            CrawlEvent::auth_required(run_id, "https://e.com/", "Basic"),
            CrawlEvent::error(run_id, "https://e.com/x", &CrawlError::Cancelled),
            CrawlEvent::shutdown(ShutdownReason::Cancelled),
        ];
        for event in &events {
            let json = serde_json::to_value(event).expect("serializable");
            assert_eq!(json["type"], event.kind());
        }
        assert_eq!(events[0].run_id(), Some(run_id));
        assert_eq!(events[3].run_id(), None);
    }
}
