//! Aggregate progress over committed pages.
//!
//! Pure functions of `(pages, goal)`: no I/O, no interior state, so the same
//! inputs always yield the same metrics.

use std::collections::HashSet;

use serde::Serialize;

use crate::config::CrawlConfig;
use crate::utils::{word_tokens, COMPLETENESS_COVERAGE_WEIGHT};

use super::crawl_types::PageRecord;
use super::goal::Goal;

/// Snapshot of how far the run has come
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressMetrics {
    pub information_density: f64,
    pub relevance: f64,
    pub uniqueness: f64,
    pub completeness: f64,
    pub keyword_coverage: f64,
    pub diminishing_returns: bool,
    pub remaining_value_estimate: f64,
    pub pages_evaluated: usize,
}

#[derive(Debug, Clone)]
pub struct ProgressEvaluator {
    volume_cap_pages: usize,
    window: usize,
    diminishing_threshold: f64,
}

impl ProgressEvaluator {
    #[must_use]
    pub fn new(volume_cap_pages: usize, window: usize, diminishing_threshold: f64) -> Self {
        Self {
            volume_cap_pages: volume_cap_pages.max(1),
            window: window.max(1),
            diminishing_threshold,
        }
    }

    #[must_use]
    pub fn from_config(config: &CrawlConfig) -> Self {
        Self::new(
            config.volume_cap_pages(),
            config.diminishing_returns_window(),
            config.diminishing_returns_threshold(),
        )
    }

    #[must_use]
    pub fn evaluate(&self, pages: &[PageRecord], goal: &Goal) -> ProgressMetrics {
        let n = pages.len();
        let mean = |f: fn(&PageRecord) -> f64| -> f64 {
            if n == 0 {
                0.0
            } else {
                pages.iter().map(f).sum::<f64>() / n as f64
            }
        };

        let information_density = mean(|p| p.metrics.information_density);
        let relevance = mean(|p| p.metrics.relevance);
        let uniqueness = mean(|p| p.metrics.uniqueness);

        let keyword_coverage = keyword_coverage(pages, goal);
        let volume = (n as f64 / self.volume_cap_pages as f64).min(1.0);
        let completeness = COMPLETENESS_COVERAGE_WEIGHT * keyword_coverage
            + (1.0 - COMPLETENESS_COVERAGE_WEIGHT) * volume;

        let recent = &pages[n.saturating_sub(self.window)..];
        let recent_uniqueness = if recent.is_empty() {
            1.0
        } else {
            recent.iter().map(|p| p.metrics.uniqueness).sum::<f64>() / recent.len() as f64
        };
        let diminishing_returns = n >= self.window && recent_uniqueness < self.diminishing_threshold;

        ProgressMetrics {
            information_density,
            relevance,
            uniqueness,
            completeness,
            keyword_coverage,
            diminishing_returns,
            remaining_value_estimate: (1.0 - completeness) * recent_uniqueness,
            pages_evaluated: n,
        }
    }
}

/// Fraction of goal keywords seen at least once across page titles and text.
///
/// A goal without usable keywords has zero coverage.
#[must_use]
pub fn keyword_coverage(pages: &[PageRecord], goal: &Goal) -> f64 {
    let keywords = goal.keywords();
    if keywords.is_empty() {
        return 0.0;
    }

    let mut remaining: HashSet<&str> = keywords.iter().map(String::as_str).collect();
    for page in pages {
        for token in word_tokens(&page.title).chain(word_tokens(&page.content)) {
            remaining.remove(token.as_str());
            if remaining.is_empty() {
                return 1.0;
            }
        }
    }
    (keywords.len() - remaining.len()) as f64 / keywords.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical_url::Canonicalizer;
    use crate::crawl_engine::crawl_types::{ExtractionOutcome, Metrics};

    fn page(i: usize, content: &str, uniqueness: f64) -> PageRecord {
        PageRecord {
            url: Canonicalizer::default()
                .canonicalize(&format!("https://example.com/{i}"), None)
                .expect("valid url"),
            depth: 0,
            status: 200,
            title: String::new(),
            content: content.to_string(),
            content_type: "page".into(),
            extraction_timestamp: chrono::Utc::now(),
            outcome: ExtractionOutcome::Extracted,
            metrics: Metrics {
                information_density: 0.4,
                relevance: 0.6,
                uniqueness,
            },
            metrics_defaulted: false,
            outbound_links: Vec::new(),
            entities: Vec::new(),
        }
    }

    #[test]
    fn empty_run_has_zero_progress() {
        let m = ProgressEvaluator::new(10, 3, 0.25).evaluate(&[], &Goal::new("rust async"));
        assert_eq!(m.completeness, 0.0);
        assert_eq!(m.relevance, 0.0);
        assert!(!m.diminishing_returns);
        assert_eq!(m.remaining_value_estimate, 1.0);
    }

    #[test]
    fn completeness_blends_coverage_and_volume() {
        let goal = Goal::new("tokio runtime scheduler metrics");
        let pages = vec![page(0, "The tokio runtime", 0.9), page(1, "scheduler internals", 0.8)];
        let m = ProgressEvaluator::new(10, 3, 0.25).evaluate(&pages, &goal);

        assert!((m.keyword_coverage - 0.75).abs() < 1e-9);
        assert!((m.completeness - (0.7 * 0.75 + 0.3 * 0.2)).abs() < 1e-9);
        assert!((m.relevance - 0.6).abs() < 1e-9);
    }

    #[test]
    fn no_keywords_means_zero_coverage() {
        let pages = vec![page(0, "whatever text", 0.9)];
        assert_eq!(keyword_coverage(&pages, &Goal::new("is it?")), 0.0);
    }

    #[test]
    fn diminishing_returns_needs_a_full_window() {
        let goal = Goal::new("topic");
        let eval = ProgressEvaluator::new(10, 3, 0.25);

        let two = vec![page(0, "a", 0.0), page(1, "b", 0.0)];
        assert!(!eval.evaluate(&two, &goal).diminishing_returns);

        let tail_low = vec![page(0, "a", 1.0), page(1, "b", 0.1), page(2, "c", 0.2), page(3, "d", 0.1)];
        assert!(eval.evaluate(&tail_low, &goal).diminishing_returns);

        let tail_ok = vec![page(0, "a", 0.1), page(1, "b", 0.1), page(2, "c", 0.9)];
        assert!(!eval.evaluate(&tail_ok, &goal).diminishing_returns);
    }

    #[test]
    fn evaluation_is_deterministic() {
        let goal = Goal::new("alpha beta");
        let pages = vec![page(0, "alpha", 0.5), page(1, "gamma", 0.3)];
        let eval = ProgressEvaluator::new(5, 2, 0.25);
        assert_eq!(eval.evaluate(&pages, &goal), eval.evaluate(&pages, &goal));
    }
}
