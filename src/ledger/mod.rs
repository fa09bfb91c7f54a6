//! Visited ledger: the single dedup point shared by the scheduler and workers.
//!
//! Every canonical URL moves `Unknown -> InFlight -> {Completed | Failed}`
//! exactly once. The transition out of `Unknown` is an atomic
//! compare-and-set on a sharded map, so two workers can never both win the
//! same URL.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use log::{debug, trace};

use crate::canonical_url::CanonicalUrl;
use crate::crawl_engine::crawl_types::ExtractionOutcome;

/// Partition a URL currently belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Unknown,
    InFlight,
    Completed,
    Failed,
}

#[derive(Debug, Clone)]
enum LedgerState {
    InFlight,
    Completed(ExtractionOutcome),
    Failed(String),
}

impl LedgerState {
    const fn partition(&self) -> Partition {
        match self {
            Self::InFlight => Partition::InFlight,
            Self::Completed(_) => Partition::Completed,
            Self::Failed(_) => Partition::Failed,
        }
    }
}

/// Per-partition counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerCounts {
    pub in_flight: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Lock-free visited ledger keyed by canonical URL
#[derive(Debug, Default)]
pub struct VisitedLedger {
    entries: DashMap<CanonicalUrl, LedgerState>,
}

impl VisitedLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `url` for fetching.
    ///
    /// Returns `true` only for the caller that moved the URL out of
    /// `Unknown`. Every later caller, in any partition, gets `false`.
    pub fn try_mark_in_flight(&self, url: &CanonicalUrl) -> bool {
        match self.entries.entry(url.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(LedgerState::InFlight);
                trace!(target: "goalscrape::ledger", "in-flight: {url}");
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Move an in-flight URL to `Completed`. No-op from any other partition.
    pub fn mark_completed(&self, url: &CanonicalUrl, outcome: ExtractionOutcome) -> bool {
        self.transition(url, LedgerState::Completed(outcome))
    }

    /// Move an in-flight URL to `Failed`. No-op from any other partition.
    pub fn mark_failed(&self, url: &CanonicalUrl, reason: impl Into<String>) -> bool {
        self.transition(url, LedgerState::Failed(reason.into()))
    }

    fn transition(&self, url: &CanonicalUrl, next: LedgerState) -> bool {
        match self.entries.get_mut(url) {
            Some(mut state) if matches!(*state, LedgerState::InFlight) => {
                debug!(target: "goalscrape::ledger", "{url} -> {:?}", next.partition());
                *state = next;
                true
            }
            Some(state) => {
                debug!(
                    target: "goalscrape::ledger",
                    "ignoring transition for {url}: already {:?}",
                    state.partition()
                );
                false
            }
            None => false,
        }
    }

    #[must_use]
    pub fn contains(&self, url: &CanonicalUrl) -> Partition {
        self.entries
            .get(url)
            .map_or(Partition::Unknown, |s| s.partition())
    }

    /// Whether the ledger has seen `url` at all.
    #[must_use]
    pub fn is_known(&self, url: &CanonicalUrl) -> bool {
        self.entries.contains_key(url)
    }

    /// Failure reason recorded for `url`, if it failed.
    #[must_use]
    pub fn failure_reason(&self, url: &CanonicalUrl) -> Option<String> {
        self.entries.get(url).and_then(|s| match &*s {
            LedgerState::Failed(reason) => Some(reason.clone()),
            _ => None,
        })
    }

    /// Extraction outcome recorded for `url`, if it completed.
    #[must_use]
    pub fn completion_outcome(&self, url: &CanonicalUrl) -> Option<ExtractionOutcome> {
        self.entries.get(url).and_then(|s| match &*s {
            LedgerState::Completed(outcome) => Some(*outcome),
            _ => None,
        })
    }

    /// URLs still in flight. Used on cancellation to fail abandoned work.
    #[must_use]
    pub fn in_flight_urls(&self) -> Vec<CanonicalUrl> {
        self.entries
            .iter()
            .filter(|e| matches!(e.value(), LedgerState::InFlight))
            .map(|e| e.key().clone())
            .collect()
    }

    #[must_use]
    pub fn counts(&self) -> LedgerCounts {
        let mut counts = LedgerCounts::default();
        for entry in &self.entries {
            match entry.value() {
                LedgerState::InFlight => counts.in_flight += 1,
                LedgerState::Completed(_) => counts.completed += 1,
                LedgerState::Failed(_) => counts.failed += 1,
            }
        }
        counts
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
