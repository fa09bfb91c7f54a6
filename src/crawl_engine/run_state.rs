//! The single mutable aggregate of a run.
//!
//! Owned by the scheduler task. Workers never touch it; they only share the
//! ledger for the in-flight claim. All mutation goes through the narrow
//! operations below.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, trace};

use crate::canonical_url::CanonicalUrl;
use crate::config::Limits;
use crate::frontier::{Frontier, FrontierEntry, PushOutcome};
use crate::ledger::{Partition, VisitedLedger};

use super::crawl_types::{CrawlError, FailureRecord, LinkCandidate, PageRecord};
use super::goal::Goal;
use super::link_filter::SimilarPathFilter;

/// Why a link did or did not make it into the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Enqueued,
    TooDeep,
    /// Already claimed, completed or failed
    AlreadyVisited,
    /// Already waiting in the frontier
    Duplicate,
    BelowThreshold,
    /// A URL with the same host+path was admitted before
    SimilarPath,
}

/// Counters a decision needs, copied out of the run state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSnapshot {
    pub frontier_len: usize,
    pub pages: usize,
    pub steps: u32,
    pub elapsed: Duration,
    pub failures: usize,
}

/// Result of committing a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitSummary {
    pub committed: bool,
    pub links_enqueued: usize,
}

#[derive(Debug)]
pub struct RunState {
    frontier: Frontier,
    ledger: Arc<VisitedLedger>,
    pages: Vec<PageRecord>,
    failures: Vec<FailureRecord>,
    step_count: u32,
    start_time: Instant,
    goal: Goal,
    limits: Limits,
    similar_paths: SimilarPathFilter,
}

impl RunState {
    #[must_use]
    pub fn new(goal: Goal, limits: Limits, ledger: Arc<VisitedLedger>, skip_similar: bool) -> Self {
        Self {
            frontier: Frontier::new(limits.min_expected_value_to_enqueue),
            ledger,
            pages: Vec::new(),
            failures: Vec::new(),
            step_count: 0,
            start_time: Instant::now(),
            goal,
            limits,
            similar_paths: SimilarPathFilter::new(skip_similar),
        }
    }

    /// Put the base URL into the frontier at depth 0.
    pub fn seed(&mut self, url: CanonicalUrl) -> PushOutcome {
        self.similar_paths.admit(&url);
        self.frontier.push_seed(url)
    }

    /// Offer a discovered link at `depth`.
    pub fn enqueue(&mut self, link: &LinkCandidate, depth: u32) -> EnqueueOutcome {
        if depth > self.limits.max_depth {
            return EnqueueOutcome::TooDeep;
        }
        if self.ledger.is_known(&link.url) {
            return EnqueueOutcome::AlreadyVisited;
        }
        if self.frontier.contains(&link.url) {
            return EnqueueOutcome::Duplicate;
        }
        if link.predicted_value < self.frontier.min_expected_value() {
            return EnqueueOutcome::BelowThreshold;
        }
        if !self.similar_paths.admit(&link.url) {
            return EnqueueOutcome::SimilarPath;
        }

        match self.frontier.push(FrontierEntry::new(
            link.url.clone(),
            depth,
            link.predicted_value,
        )) {
            PushOutcome::Enqueued => EnqueueOutcome::Enqueued,
            PushOutcome::Duplicate => EnqueueOutcome::Duplicate,
            PushOutcome::BelowThreshold => EnqueueOutcome::BelowThreshold,
        }
    }

    /// Pop the best entry whose URL the ledger has not seen yet.
    pub fn next_entry(&mut self) -> Option<FrontierEntry> {
        while let Some(entry) = self.frontier.pop() {
            if self.ledger.is_known(&entry.url) {
                trace!(target: "goalscrape::run_state", "skipping known {}", entry.url);
                continue;
            }
            return Some(entry);
        }
        None
    }

    /// Accept a processed page and push its outbound links one level deeper.
    ///
    /// A page arriving after the page budget is full is failed instead, so
    /// the committed count never exceeds `max_pages`.
    pub fn commit_page(&mut self, page: PageRecord, links: &[LinkCandidate]) -> CommitSummary {
        if self.pages.len() >= self.limits.max_pages {
            let err = CrawlError::FetchFatal {
                url: page.url.to_string(),
                reason: "page budget already reached".into(),
                status: Some(page.status),
            };
            self.record_failure(&page.url, page.depth, &err);
            return CommitSummary {
                committed: false,
                links_enqueued: 0,
            };
        }

        if !self.ledger.mark_completed(&page.url, page.outcome) {
            debug!(
                target: "goalscrape::run_state",
                "{} was not in flight, dropping duplicate result",
                page.url
            );
            return CommitSummary {
                committed: false,
                links_enqueued: 0,
            };
        }

        let child_depth = page.depth + 1;
        let links_enqueued = links
            .iter()
            .filter(|link| self.enqueue(link, child_depth) == EnqueueOutcome::Enqueued)
            .count();

        self.pages.push(page);
        CommitSummary {
            committed: true,
            links_enqueued,
        }
    }

    /// Fail a URL. Only URLs still in flight produce a failure record.
    pub fn record_failure(&mut self, url: &CanonicalUrl, depth: u32, error: &CrawlError) -> bool {
        if self.ledger.mark_failed(url, error.to_string()) {
            self.failures
                .push(FailureRecord::new(url.clone(), depth, error));
            return true;
        }
        if self.ledger.contains(url) == Partition::Failed
            && !self.failures.iter().any(|f| &f.url == url)
        {
            self.failures
                .push(FailureRecord::new(url.clone(), depth, error));
            return true;
        }
        false
    }

    pub fn increment_step(&mut self) -> u32 {
        self.step_count += 1;
        self.step_count
    }

    #[must_use]
    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            frontier_len: self.frontier.len(),
            pages: self.pages.len(),
            steps: self.step_count,
            elapsed: self.start_time.elapsed(),
            failures: self.failures.len(),
        }
    }

    #[must_use]
    pub fn pages(&self) -> &[PageRecord] {
        &self.pages
    }

    #[must_use]
    pub fn failures(&self) -> &[FailureRecord] {
        &self.failures
    }

    #[must_use]
    pub fn goal(&self) -> &Goal {
        &self.goal
    }

    #[must_use]
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    #[must_use]
    pub fn steps(&self) -> u32 {
        self.step_count
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    #[must_use]
    pub fn ledger(&self) -> &Arc<VisitedLedger> {
        &self.ledger
    }

    /// Remaining room in the page budget
    #[must_use]
    pub fn remaining_pages(&self) -> usize {
        self.limits.max_pages.saturating_sub(self.pages.len())
    }

    /// Consume the state into committed pages and failures.
    #[must_use]
    pub fn into_results(self) -> (Vec<PageRecord>, Vec<FailureRecord>) {
        (self.pages, self.failures)
    }
}
