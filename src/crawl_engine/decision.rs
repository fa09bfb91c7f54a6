//! Navigation decisions: continue with the best frontier URL, or stop.
//!
//! Completion rules are checked in a fixed order, so when several apply at
//! once the first one names the reason.

use std::fmt;

use serde::Serialize;

use crate::config::{CrawlConfig, Limits};
use crate::frontier::FrontierEntry;
use crate::utils::GOAL_COMPLETENESS_THRESHOLD;

use super::evaluator::ProgressMetrics;
use super::run_state::{RunSnapshot, RunState};

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompletionReason {
    FrontierExhausted,
    PageBudgetReached,
    StepBudgetReached,
    TimeBudgetReached,
    GoalSatisfied,
    DiminishingReturns,
    Cancelled,
}

impl CompletionReason {
    /// Human-readable reason string carried in the summary
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FrontierExhausted => "frontier exhausted",
            Self::PageBudgetReached => "page budget reached",
            Self::StepBudgetReached => "step budget reached",
            Self::TimeBudgetReached => "time budget reached",
            Self::GoalSatisfied => "goal satisfied",
            Self::DiminishingReturns => "diminishing returns",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether the run stopped because a resource budget ran out
    #[must_use]
    pub const fn is_budget_exhausted(&self) -> bool {
        matches!(
            self,
            Self::PageBudgetReached | Self::StepBudgetReached | Self::TimeBudgetReached
        )
    }
}

impl fmt::Display for CompletionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the navigation state machine stands after a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationState {
    Selecting,
    Continue,
    Complete,
}

#[derive(Debug, Clone)]
pub enum NavigationAction {
    Continue(FrontierEntry),
    Complete(CompletionReason),
}

#[derive(Debug, Clone)]
pub struct Decision {
    pub action: NavigationAction,
    pub completion_estimate: f64,
}

impl Decision {
    #[must_use]
    pub fn state(&self) -> NavigationState {
        match self.action {
            NavigationAction::Continue(_) => NavigationState::Continue,
            NavigationAction::Complete(_) => NavigationState::Complete,
        }
    }

    /// Reason text, `"continue"` when the run goes on.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match &self.action {
            NavigationAction::Continue(_) => "continue",
            NavigationAction::Complete(reason) => reason.as_str(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DecisionEngine {
    limits: Limits,
    min_pages_before_goal_check: usize,
    goal_threshold: f64,
}

impl DecisionEngine {
    #[must_use]
    pub fn new(limits: Limits, min_pages_before_goal_check: usize) -> Self {
        Self {
            limits,
            min_pages_before_goal_check,
            goal_threshold: GOAL_COMPLETENESS_THRESHOLD,
        }
    }

    #[must_use]
    pub fn from_config(config: &CrawlConfig) -> Self {
        Self::new(*config.limits(), config.min_pages_before_goal_check())
    }

    /// First completion rule that applies, if any.
    #[must_use]
    pub fn check_completion(
        &self,
        run: &RunSnapshot,
        progress: &ProgressMetrics,
    ) -> Option<CompletionReason> {
        let goal_checks_armed = run.pages >= self.min_pages_before_goal_check;

        if run.frontier_len == 0 {
            Some(CompletionReason::FrontierExhausted)
        } else if run.pages >= self.limits.max_pages {
            Some(CompletionReason::PageBudgetReached)
        } else if run.steps >= self.limits.max_steps {
            Some(CompletionReason::StepBudgetReached)
        } else if run.elapsed >= self.limits.max_wall_clock {
            Some(CompletionReason::TimeBudgetReached)
        } else if goal_checks_armed && progress.completeness >= self.goal_threshold {
            Some(CompletionReason::GoalSatisfied)
        } else if goal_checks_armed && progress.diminishing_returns {
            Some(CompletionReason::DiminishingReturns)
        } else {
            None
        }
    }

    /// Completeness for goal-driven stops, page-budget fraction otherwise.
    #[must_use]
    pub fn completion_estimate(
        &self,
        reason: Option<CompletionReason>,
        pages: usize,
        progress: &ProgressMetrics,
    ) -> f64 {
        match reason {
            Some(CompletionReason::GoalSatisfied | CompletionReason::DiminishingReturns) => {
                progress.completeness
            }
            _ => (pages as f64 / self.limits.max_pages as f64).min(1.0),
        }
    }

    /// Decide the next move, popping the chosen URL from the frontier.
    ///
    /// An empty pop re-runs the rules from the top, which then reports the
    /// frontier as exhausted.
    pub fn decide(&self, run: &mut RunState, progress: &ProgressMetrics) -> Decision {
        loop {
            let snapshot = run.snapshot();
            if let Some(reason) = self.check_completion(&snapshot, progress) {
                return Decision {
                    action: NavigationAction::Complete(reason),
                    completion_estimate: self.completion_estimate(
                        Some(reason),
                        snapshot.pages,
                        progress,
                    ),
                };
            }

            if let Some(entry) = run.next_entry() {
                return Decision {
                    action: NavigationAction::Continue(entry),
                    completion_estimate: self.completion_estimate(None, snapshot.pages, progress),
                };
            }
        }
    }

    #[must_use]
    pub fn limits(&self) -> &Limits {
        &self.limits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn limits() -> Limits {
        Limits {
            max_pages: 10,
            max_depth: 3,
            max_steps: 20,
            max_wall_clock: Duration::from_secs(60),
            min_expected_value_to_enqueue: 0.1,
        }
    }

    fn snapshot(frontier_len: usize, pages: usize, steps: u32, elapsed_secs: u64) -> RunSnapshot {
        RunSnapshot {
            frontier_len,
            pages,
            steps,
            elapsed: Duration::from_secs(elapsed_secs),
            failures: 0,
        }
    }

    fn progress(completeness: f64, diminishing_returns: bool) -> ProgressMetrics {
        ProgressMetrics {
            information_density: 0.5,
            relevance: 0.5,
            uniqueness: 0.5,
            completeness,
            keyword_coverage: completeness,
            diminishing_returns,
            remaining_value_estimate: 0.0,
            pages_evaluated: 0,
        }
    }

    #[test]
    fn rules_apply_in_order() {
        let engine = DecisionEngine::new(limits(), 3);
        let done = progress(0.95, true);

        // Everything applies at once: frontier wins.
        assert_eq!(
            engine.check_completion(&snapshot(0, 10, 20, 61), &done),
            Some(CompletionReason::FrontierExhausted)
        );
        assert_eq!(
            engine.check_completion(&snapshot(5, 10, 20, 61), &done),
            Some(CompletionReason::PageBudgetReached)
        );
        assert_eq!(
            engine.check_completion(&snapshot(5, 9, 20, 61), &done),
            Some(CompletionReason::StepBudgetReached)
        );
        assert_eq!(
            engine.check_completion(&snapshot(5, 9, 19, 60), &done),
            Some(CompletionReason::TimeBudgetReached)
        );
        assert_eq!(
            engine.check_completion(&snapshot(5, 9, 19, 1), &done),
            Some(CompletionReason::GoalSatisfied)
        );
        assert_eq!(
            engine.check_completion(&snapshot(5, 9, 19, 1), &progress(0.5, true)),
            Some(CompletionReason::DiminishingReturns)
        );
        assert_eq!(
            engine.check_completion(&snapshot(5, 9, 19, 1), &progress(0.5, false)),
            None
        );
    }

    #[test]
    fn goal_checks_wait_for_minimum_pages() {
        let engine = DecisionEngine::new(limits(), 3);
        assert_eq!(
            engine.check_completion(&snapshot(5, 2, 1, 1), &progress(1.0, true)),
            None
        );
        assert_eq!(
            engine.check_completion(&snapshot(5, 3, 1, 1), &progress(0.85, false)),
            Some(CompletionReason::GoalSatisfied)
        );
    }

    #[test]
    fn completion_estimate_depends_on_reason() {
        let engine = DecisionEngine::new(limits(), 3);
        let p = progress(0.9, false);
        assert_eq!(
            engine.completion_estimate(Some(CompletionReason::GoalSatisfied), 4, &p),
            0.9
        );
        assert_eq!(
            engine.completion_estimate(Some(CompletionReason::FrontierExhausted), 4, &p),
            0.4
        );
        assert_eq!(engine.completion_estimate(None, 20, &p), 1.0);
    }

    #[test]
    fn reason_strings_are_stable() {
        assert_eq!(CompletionReason::FrontierExhausted.to_string(), "frontier exhausted");
        assert_eq!(CompletionReason::PageBudgetReached.to_string(), "page budget reached");
        assert_eq!(CompletionReason::StepBudgetReached.to_string(), "step budget reached");
        assert_eq!(CompletionReason::TimeBudgetReached.to_string(), "time budget reached");
        assert_eq!(CompletionReason::GoalSatisfied.to_string(), "goal satisfied");
        assert_eq!(CompletionReason::DiminishingReturns.to_string(), "diminishing returns");
        assert_eq!(CompletionReason::Cancelled.to_string(), "cancelled");
        assert!(CompletionReason::StepBudgetReached.is_budget_exhausted());
        assert!(!CompletionReason::GoalSatisfied.is_budget_exhausted());
    }
}
