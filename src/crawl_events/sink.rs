//! Fire-and-forget event sinks used by the scheduler.

use log::{debug, info, warn};

use super::types::CrawlEvent;

/// Receives run events. `emit` must not block and must not fail the run.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: CrawlEvent);
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpSink;

impl EventSink for NoOpSink {
    #[inline]
    fn emit(&self, _event: CrawlEvent) {}
}

/// Writes events to the `log` facade
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: CrawlEvent) {
        match &event {
            CrawlEvent::Started { base_url, goal, .. } => {
                info!(target: "goalscrape::events", "started {base_url} goal=\"{goal}\"");
            }
            CrawlEvent::PageProcessed {
                url, depth, metadata, ..
            } => {
                info!(
                    target: "goalscrape::events",
                    "page #{} [depth {depth}] {url} ({} bytes, {} links queued)",
                    metadata.pages_so_far, metadata.content_size, metadata.links_enqueued
                );
            }
            CrawlEvent::AuthRequired {
                url, challenge_type, ..
            } => {
                warn!(target: "goalscrape::events", "auth required for {url} ({challenge_type})");
            }
            CrawlEvent::Completed { summary, .. } => {
                info!(
                    target: "goalscrape::events",
                    "completed: {} after {} pages / {} steps",
                    summary.completion_reason, summary.pages_scraped, summary.steps_taken
                );
            }
            CrawlEvent::Error {
                url, kind, message, ..
            } => {
                warn!(target: "goalscrape::events", "{kind} on {url}: {message}");
            }
            CrawlEvent::Shutdown { reason, .. } => {
                debug!(target: "goalscrape::events", "shutdown: {reason:?}");
            }
        }
    }
}

impl<T: EventSink + ?Sized> EventSink for std::sync::Arc<T> {
    fn emit(&self, event: CrawlEvent) {
        (**self).emit(event);
    }
}
