//! Priority frontier of URLs waiting to be fetched.
//!
//! Ordered by expected value (highest first), then depth (shallowest first),
//! then discovery order (oldest first). The frontier knows nothing about what
//! has been visited; callers consult the ledger before pushing.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use serde::Serialize;

use crate::canonical_url::CanonicalUrl;
use crate::crawl_engine::crawl_types::clamp_unit;

/// A URL waiting in the frontier
#[derive(Debug, Clone, Serialize)]
pub struct FrontierEntry {
    pub url: CanonicalUrl,
    pub depth: u32,
    pub expected_value: f64,
    /// Insertion sequence number, stamped by [`Frontier::push`]
    pub discovered_at: u64,
}

impl FrontierEntry {
    /// New entry; `discovered_at` is assigned on push.
    #[must_use]
    pub fn new(url: CanonicalUrl, depth: u32, expected_value: f64) -> Self {
        Self {
            url,
            depth,
            expected_value: clamp_unit(expected_value),
            discovered_at: 0,
        }
    }
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FrontierEntry {}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierEntry {
    // Max-heap: "greater" pops first.
    fn cmp(&self, other: &Self) -> Ordering {
        self.expected_value
            .total_cmp(&other.expected_value)
            .then_with(|| other.depth.cmp(&self.depth))
            .then_with(|| other.discovered_at.cmp(&self.discovered_at))
    }
}

/// What happened to a pushed entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Enqueued,
    /// The URL is already waiting in the frontier
    Duplicate,
    /// Expected value under the admission threshold
    BelowThreshold,
}

/// Binary-heap frontier with membership tracking
#[derive(Debug)]
pub struct Frontier {
    heap: BinaryHeap<FrontierEntry>,
    members: HashSet<CanonicalUrl>,
    min_expected_value: f64,
    next_seq: u64,
}

impl Frontier {
    #[must_use]
    pub fn new(min_expected_value: f64) -> Self {
        Self {
            heap: BinaryHeap::new(),
            members: HashSet::new(),
            min_expected_value: clamp_unit(min_expected_value),
            next_seq: 0,
        }
    }

    /// Insert an entry unless it duplicates a waiting URL or scores too low.
    pub fn push(&mut self, mut entry: FrontierEntry) -> PushOutcome {
        entry.expected_value = clamp_unit(entry.expected_value);

        if entry.expected_value < self.min_expected_value {
            return PushOutcome::BelowThreshold;
        }
        if self.members.contains(&entry.url) {
            return PushOutcome::Duplicate;
        }

        entry.discovered_at = self.next_seq;
        self.next_seq += 1;
        self.members.insert(entry.url.clone());
        self.heap.push(entry);
        PushOutcome::Enqueued
    }

    /// Insert the seed entry, bypassing the admission threshold.
    pub fn push_seed(&mut self, url: CanonicalUrl) -> PushOutcome {
        if self.members.contains(&url) {
            return PushOutcome::Duplicate;
        }
        let entry = FrontierEntry {
            url: url.clone(),
            depth: 0,
            expected_value: 1.0,
            discovered_at: self.next_seq,
        };
        self.next_seq += 1;
        self.members.insert(url);
        self.heap.push(entry);
        PushOutcome::Enqueued
    }

    pub fn pop(&mut self) -> Option<FrontierEntry> {
        let entry = self.heap.pop()?;
        self.members.remove(&entry.url);
        Some(entry)
    }

    #[must_use]
    pub fn peek(&self) -> Option<&FrontierEntry> {
        self.heap.peek()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    #[must_use]
    pub fn contains(&self, url: &CanonicalUrl) -> bool {
        self.members.contains(url)
    }

    #[must_use]
    pub fn min_expected_value(&self) -> f64 {
        self.min_expected_value
    }
}
