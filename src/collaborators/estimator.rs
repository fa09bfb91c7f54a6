//! Value estimation interface and a keyword heuristic implementation.
//!
//! The scheduler never depends on how scores are produced: an LLM-backed
//! estimator and the heuristic here are interchangeable.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;

use crate::crawl_engine::crawl_types::{clamp_unit, CrawlResult, LinkCandidate, Metrics};
use crate::crawl_engine::goal::Goal;
use crate::utils::{is_stopword, word_tokens};

/// Scores page content and candidate links against the goal.
///
/// Both calls may suspend. The pipeline wraps them in a timeout and falls
/// back to a neutral score on error.
#[async_trait]
pub trait ValueEstimator: Send + Sync {
    async fn score_content(&self, text: &str, goal: &Goal) -> CrawlResult<Metrics>;

    /// Predicted value in `[0, 1]` of following `link`.
    async fn score_link(&self, link: &LinkCandidate, goal: &Goal) -> CrawlResult<f64>;

    /// Instance to use for a new run. Estimators holding state across pages
    /// return a fresh one; stateless ones keep the default and are shared.
    fn for_run(&self) -> Option<Arc<dyn ValueEstimator>> {
        None
    }
}

static HIGH_VALUE_KEYWORDS: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?i)\b(docs?|documentation|guide|tutorial|learn|reference|manual|overview|api|faq|pricing)\b")
        .ok()
});

static UTILITY_KEYWORDS: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?i)\b(login|logout|signin|signout|register|signup|cart|checkout|account)\b").ok()
});

static LEGAL_KEYWORDS: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)\b(privacy|terms|cookies?|gdpr|legal|disclaimer)\b").ok());

static SOCIAL_KEYWORDS: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?i)\b(share|tweet|facebook|twitter|linkedin|pinterest|reddit)\b").ok()
});

fn is_match(re: &Lazy<Option<Regex>>, haystack: &str) -> bool {
    re.as_ref().is_some_and(|r| r.is_match(haystack))
}

/// Path depth beyond which links lose value
const MAX_PATH_DEPTH: usize = 4;

/// Words of content at which the length factor saturates
const FULL_LENGTH_WORDS: f64 = 300.0;

/// Heuristic estimator driven by goal keyword overlap.
///
/// Uniqueness is measured against the vocabulary of every page this
/// instance has scored before. The scheduler asks for a fresh instance per
/// run through [`ValueEstimator::for_run`].
#[derive(Debug, Default)]
pub struct KeywordEstimator {
    seen_vocabulary: Mutex<HashSet<String>>,
}

impl KeywordEstimator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn keyword_fraction(goal: &Goal, haystack: &str) -> f64 {
        let keywords = goal.keywords();
        if keywords.is_empty() {
            return 0.0;
        }
        let tokens: HashSet<String> = word_tokens(haystack).collect();
        let hits = keywords.iter().filter(|k| tokens.contains(*k)).count();
        hits as f64 / keywords.len() as f64
    }
}

#[async_trait]
impl ValueEstimator for KeywordEstimator {
    async fn score_content(&self, text: &str, goal: &Goal) -> CrawlResult<Metrics> {
        let tokens: Vec<String> = word_tokens(text).collect();
        if tokens.is_empty() {
            return Ok(Metrics::zero());
        }

        let total = tokens.len() as f64;
        let content_words: Vec<&String> = tokens.iter().filter(|t| !is_stopword(t)).collect();
        let content_ratio = content_words.len() as f64 / total;
        let length_factor = (total / FULL_LENGTH_WORDS).min(1.0);
        let information_density = 0.6 * content_ratio + 0.4 * length_factor;

        let keywords = goal.keywords();
        let relevance = if keywords.is_empty() {
            0.0
        } else {
            let coverage = Self::keyword_fraction(goal, text);
            let hits = tokens.iter().filter(|t| keywords.contains(*t)).count() as f64;
            let frequency = (hits * 20.0 / total).min(1.0);
            0.8 * coverage + 0.2 * frequency
        };

        let distinct: HashSet<&str> = content_words.iter().map(|w| w.as_str()).collect();
        let uniqueness = {
            let mut seen = self.seen_vocabulary.lock();
            let fresh = distinct.iter().filter(|w| !seen.contains(**w)).count();
            seen.extend(distinct.iter().map(|w| (*w).to_string()));
            if distinct.is_empty() {
                0.0
            } else {
                fresh as f64 / distinct.len() as f64
            }
        };

        Ok(Metrics {
            information_density,
            relevance,
            uniqueness,
        }
        .clamped())
    }

    async fn score_link(&self, link: &LinkCandidate, goal: &Goal) -> CrawlResult<f64> {
        let url = link.url.as_url();
        let path = url.path();
        let label = format!("{} {}", link.anchor_text, path.replace(['/', '-', '_', '.'], " "));

        let mut score = if goal.keywords().is_empty() { 0.5 } else { 0.3 };
        score += 0.5 * Self::keyword_fraction(goal, &label);
        score += 0.2 * Self::keyword_fraction(goal, &link.surrounding_context);

        if is_match(&HIGH_VALUE_KEYWORDS, &label) {
            score += 0.15;
        }
        if is_match(&UTILITY_KEYWORDS, &label)
            || is_match(&LEGAL_KEYWORDS, &label)
            || is_match(&SOCIAL_KEYWORDS, &label)
        {
            score -= 0.25;
        }

        let depth = path.split('/').filter(|s| !s.is_empty()).count();
        if depth > MAX_PATH_DEPTH {
            score -= 0.05 * (depth - MAX_PATH_DEPTH) as f64;
        }
        if url.query().is_some() {
            score -= 0.05;
        }

        Ok(clamp_unit(score))
    }

    fn for_run(&self) -> Option<Arc<dyn ValueEstimator>> {
        Some(Arc::new(Self::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical_url::Canonicalizer;

    fn link(raw: &str, anchor: &str) -> LinkCandidate {
        LinkCandidate {
            url: Canonicalizer::default()
                .canonicalize(raw, None)
                .expect("valid url"),
            anchor_text: anchor.to_string(),
            surrounding_context: String::new(),
            predicted_value: 0.0,
        }
    }

    #[tokio::test]
    async fn relevant_content_scores_higher() {
        let goal = Goal::new("tokio runtime scheduling");
        let relevant = KeywordEstimator::new()
            .score_content("The tokio runtime uses work-stealing scheduling across threads.", &goal)
            .await
            .expect("scores");
        let unrelated = KeywordEstimator::new()
            .score_content("Our bakery sells bread and pastries every morning.", &goal)
            .await
            .expect("scores");
        assert!(relevant.relevance > unrelated.relevance);
        assert_eq!(unrelated.relevance, 0.0);
    }

    #[tokio::test]
    async fn repeated_content_loses_uniqueness() {
        let goal = Goal::new("tokio runtime");
        let estimator = KeywordEstimator::new();
        let text = "tokio runtime executes futures on worker threads";
        let first = estimator.score_content(text, &goal).await.expect("scores");
        let second = estimator.score_content(text, &goal).await.expect("scores");
        assert_eq!(first.uniqueness, 1.0);
        assert_eq!(second.uniqueness, 0.0);
    }

    #[tokio::test]
    async fn fresh_run_instance_forgets_vocabulary() {
        let goal = Goal::new("tokio runtime");
        let estimator = KeywordEstimator::new();
        let text = "tokio runtime executes futures on worker threads";
        estimator.score_content(text, &goal).await.expect("scores");

        let next_run = estimator.for_run().expect("stateful estimator forks");
        let again = next_run.score_content(text, &goal).await.expect("scores");
        assert_eq!(again.uniqueness, 1.0);
    }

    #[tokio::test]
    async fn empty_text_scores_zero() {
        let metrics = KeywordEstimator::new()
            .score_content("   ", &Goal::new("anything useful"))
            .await
            .expect("scores");
        assert_eq!(metrics, Metrics::zero());
    }

    #[tokio::test]
    async fn links_matching_goal_outrank_utility_links() {
        let goal = Goal::new("pricing plans");
        let estimator = KeywordEstimator::new();
        let pricing = estimator
            .score_link(&link("https://e.com/pricing", "Pricing plans"), &goal)
            .await
            .expect("scores");
        let login = estimator
            .score_link(&link("https://e.com/login", "Sign in to your account"), &goal)
            .await
            .expect("scores");
        assert!(pricing > login, "{pricing} <= {login}");
        assert!((0.0..=1.0).contains(&pricing));
    }
}
