//! Main crawl orchestration logic
//!
//! A bounded, iterative loop. Each cycle:
//! - checks cancellation
//! - evaluates progress over committed pages
//! - asks the decision engine whether to go on
//! - dispatches a batch of workers and commits their results as they finish
//!
//! The run state lives on the scheduler task only. Workers share the ledger
//! (for the in-flight claim) and the pipeline collaborators.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use log::{debug, error, info, warn};
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::collaborators::AuthProvider;
use crate::config::CrawlConfig;
use crate::crawl_events::{CrawlEvent, EventSink};
use crate::frontier::FrontierEntry;
use crate::ledger::{Partition, VisitedLedger};

use super::crawl_types::{CrawlError, CrawlOutput, LinkCandidate, PageRecord, RunSummary};
use super::decision::{CompletionReason, DecisionEngine, NavigationAction};
use super::evaluator::{ProgressEvaluator, keyword_coverage};
use super::goal::Goal;
use super::page_processor::PagePipeline;
use super::page_timeout::with_timeout;
use super::run_state::RunState;

/// What a worker hands back to the scheduler
#[derive(Debug)]
enum WorkerOutcome {
    Page(Box<PageRecord>, Vec<LinkCandidate>),
    Failed(CrawlError),
    /// Another worker already claimed the URL
    Skipped,
}

/// How a dispatched batch ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchEnd {
    Drained,
    Cancelled,
    OutOfTime,
}

/// Shared, cheaply clonable state every worker gets
#[derive(Clone)]
struct WorkerContext {
    run_id: Uuid,
    goal: Arc<Goal>,
    pipeline: PagePipeline,
    auth: Option<Arc<dyn AuthProvider>>,
    events: Arc<dyn EventSink>,
    ledger: Arc<VisitedLedger>,
    auth_timeout: Duration,
}

/// Goal-directed crawl scheduler. Build one with
/// [`SchedulerBuilder`](super::execution::SchedulerBuilder).
pub struct CrawlScheduler {
    pub(crate) config: Arc<CrawlConfig>,
    pub(crate) pipeline: PagePipeline,
    pub(crate) auth: Option<Arc<dyn AuthProvider>>,
    pub(crate) events: Arc<dyn EventSink>,
}

impl CrawlScheduler {
    #[must_use]
    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Execute one run to completion.
    ///
    /// Never fails: per-page errors become failure records, and the output
    /// always carries a summary. Raising `cancel` stops dispatch, lets
    /// in-flight pages finish within the grace period and completes the run
    /// as cancelled. Workers still running when `max_wall_clock` elapses are
    /// aborted and the run completes on its time budget.
    pub async fn run(&self, cancel: CancellationToken) -> CrawlOutput {
        let run_id = Uuid::new_v4();
        let goal = Goal::new(self.config.goal());
        let ledger = Arc::new(VisitedLedger::new());
        let mut run = RunState::new(
            goal.clone(),
            *self.config.limits(),
            Arc::clone(&ledger),
            self.config.skip_similar_paths(),
        );
        run.seed(self.config.base_url().clone());

        let evaluator = ProgressEvaluator::from_config(&self.config);
        let engine = DecisionEngine::from_config(&self.config);

        info!(
            target: "goalscrape::scheduler",
            "Run {run_id} started at {} (goal: \"{goal}\", keywords: {:?})",
            self.config.base_url(),
            goal.keywords()
        );
        self.events.emit(CrawlEvent::started(
            run_id,
            self.config.base_url().as_str(),
            goal.text(),
        ));

        let ctx = WorkerContext {
            run_id,
            goal: Arc::new(goal),
            pipeline: self.pipeline.for_run(),
            auth: self.auth.clone(),
            events: Arc::clone(&self.events),
            ledger,
            auth_timeout: self.config.request_timeout(),
        };

        let reason = loop {
            if cancel.is_cancelled() {
                break CompletionReason::Cancelled;
            }

            let progress = evaluator.evaluate(run.pages(), run.goal());
            let decision = engine.decide(&mut run, &progress);
            debug!(
                target: "goalscrape::scheduler",
                "step {} -> {:?} ({}), completeness {:.2}",
                run.steps(),
                decision.state(),
                decision.reason(),
                progress.completeness
            );

            let first = match decision.action {
                NavigationAction::Complete(reason) => break reason,
                NavigationAction::Continue(entry) => entry,
            };

            run.increment_step();
            let batch = self.fill_batch(&mut run, first);
            let budget_left = run.limits().max_wall_clock.saturating_sub(run.elapsed());
            match self.dispatch(&ctx, &mut run, batch, &cancel, budget_left).await {
                BatchEnd::Drained => {}
                BatchEnd::Cancelled => break CompletionReason::Cancelled,
                BatchEnd::OutOfTime => break CompletionReason::TimeBudgetReached,
            }
        };

        let progress = evaluator.evaluate(run.pages(), run.goal());
        let summary = RunSummary {
            run_id,
            pages_scraped: run.pages().len(),
            total_content_size: run.pages().iter().map(PageRecord::content_size).sum(),
            execution_time: run.elapsed(),
            goal_completion: engine.completion_estimate(Some(reason), run.pages().len(), &progress),
            coverage_score: keyword_coverage(run.pages(), run.goal()),
            completion_reason: reason,
            steps_taken: run.steps(),
            failed_urls: run.failures().len(),
        };

        info!(
            target: "goalscrape::scheduler",
            "Run {run_id} complete: {reason}. {} pages, {} failures, {} steps in {:.1}s",
            summary.pages_scraped,
            summary.failed_urls,
            summary.steps_taken,
            summary.execution_time.as_secs_f64()
        );
        self.events
            .emit(CrawlEvent::completed(run_id, summary.clone()));

        let (pages, failures) = run.into_results();
        CrawlOutput {
            pages,
            failures,
            summary,
        }
    }

    /// The decided entry plus further pops, bounded by concurrency and the
    /// remaining page budget.
    fn fill_batch(&self, run: &mut RunState, first: FrontierEntry) -> Vec<FrontierEntry> {
        let size = self
            .config
            .concurrency()
            .min(run.remaining_pages())
            .max(1);
        let mut batch = Vec::with_capacity(size);
        batch.push(first);
        while batch.len() < size
            && let Some(entry) = run.next_entry()
        {
            batch.push(entry);
        }
        batch
    }

    /// Run a batch until it drains, `cancel` is raised or `budget_left` runs out.
    async fn dispatch(
        &self,
        ctx: &WorkerContext,
        run: &mut RunState,
        batch: Vec<FrontierEntry>,
        cancel: &CancellationToken,
        budget_left: Duration,
    ) -> BatchEnd {
        let mut abort_handles = Vec::with_capacity(batch.len());
        let mut pending = FuturesUnordered::new();

        for entry in batch {
            let worker_ctx = ctx.clone();
            let worker_entry = entry.clone();
            let handle = tokio::spawn(async move { run_worker(worker_ctx, worker_entry).await });
            abort_handles.push(handle.abort_handle());
            pending.push(async move { (entry, handle.await) });
        }

        let deadline = tokio::time::sleep(budget_left);
        tokio::pin!(deadline);
        let end = loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break BatchEnd::Cancelled,
                () = &mut deadline => break BatchEnd::OutOfTime,
                next = pending.next() => match next {
                    Some((entry, joined)) => self.commit(ctx.run_id, run, &entry, joined),
                    None => return BatchEnd::Drained,
                },
            }
        };

        if end == BatchEnd::OutOfTime {
            info!(
                target: "goalscrape::scheduler",
                "Time budget ran out, aborting {} workers",
                pending.len()
            );
        } else {
            info!(
                target: "goalscrape::scheduler",
                "Cancellation requested, {} workers in flight",
                pending.len()
            );

            // In-flight work may finish within the grace period. Zero aborts at once.
            let grace_period = self.config.cancel_grace_period();
            if !grace_period.is_zero() {
                let grace = tokio::time::sleep(grace_period);
                tokio::pin!(grace);
                loop {
                    tokio::select! {
                        () = &mut grace => break,
                        next = pending.next() => match next {
                            Some((entry, joined)) => self.commit(ctx.run_id, run, &entry, joined),
                            None => return end,
                        },
                    }
                }
            }
        }

        for handle in &abort_handles {
            handle.abort();
        }
        // A worker that finished before its abort still commits.
        while let Some((entry, joined)) = pending.next().await {
            match joined {
                Err(join_error) if join_error.is_cancelled() => {
                    if run.ledger().contains(&entry.url) == Partition::InFlight
                        && run.record_failure(&entry.url, entry.depth, &CrawlError::Cancelled)
                    {
                        self.events.emit(CrawlEvent::error(
                            ctx.run_id,
                            entry.url.as_str(),
                            &CrawlError::Cancelled,
                        ));
                    }
                }
                joined => self.commit(ctx.run_id, run, &entry, joined),
            }
        }
        end
    }

    fn commit(
        &self,
        run_id: Uuid,
        run: &mut RunState,
        entry: &FrontierEntry,
        joined: Result<WorkerOutcome, JoinError>,
    ) {
        let error = match joined {
            Ok(WorkerOutcome::Page(page, links)) => {
                let summary = run.commit_page(*page, &links);
                if summary.committed {
                    if let Some(page) = run.pages().last() {
                        self.events.emit(CrawlEvent::page_processed(
                            run_id,
                            page,
                            summary.links_enqueued,
                            run.pages().len(),
                        ));
                    }
                } else {
                    debug!(target: "goalscrape::scheduler", "Result for {} not committed", entry.url);
                }
                return;
            }
            Ok(WorkerOutcome::Skipped) => {
                debug!(target: "goalscrape::scheduler", "{} already claimed", entry.url);
                return;
            }
            Ok(WorkerOutcome::Failed(e)) => e,
            Err(join_error) => {
                error!(target: "goalscrape::scheduler", "Worker for {} panicked: {join_error}", entry.url);
                CrawlError::FetchFatal {
                    url: entry.url.to_string(),
                    reason: format!("worker task failed: {join_error}"),
                    status: None,
                }
            }
        };

        warn!(target: "goalscrape::scheduler", "Failed {}: {error}", entry.url);
        if run.record_failure(&entry.url, entry.depth, &error) {
            self.events
                .emit(CrawlEvent::error(run_id, entry.url.as_str(), &error));
        }
    }
}

impl std::fmt::Debug for CrawlScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrawlScheduler")
            .field("config", &self.config)
            .field("auth", &self.auth.is_some())
            .finish_non_exhaustive()
    }
}

/// Claim the URL, process it, and escalate once to the auth provider if the
/// origin asks for credentials.
async fn run_worker(ctx: WorkerContext, entry: FrontierEntry) -> WorkerOutcome {
    if !ctx.ledger.try_mark_in_flight(&entry.url) {
        return WorkerOutcome::Skipped;
    }

    let challenge_type = match ctx.pipeline.process(&entry, &ctx.goal).await {
        Ok((page, links)) => return WorkerOutcome::Page(Box::new(page), links),
        Err(CrawlError::AuthenticationRequired { challenge_type, .. }) => challenge_type,
        Err(e) => return WorkerOutcome::Failed(e),
    };

    ctx.events.emit(CrawlEvent::auth_required(
        ctx.run_id,
        entry.url.as_str(),
        challenge_type.as_str(),
    ));

    let auth_error = || CrawlError::AuthenticationRequired {
        url: entry.url.to_string(),
        challenge_type: challenge_type.clone(),
    };
    let Some(provider) = &ctx.auth else {
        return WorkerOutcome::Failed(auth_error());
    };

    let artifacts = match with_timeout(
        provider.authenticate(&entry.url, &challenge_type),
        ctx.auth_timeout,
        auth_error,
    )
    .await
    {
        Ok(artifacts) => artifacts,
        Err(e) => {
            warn!(target: "goalscrape::scheduler", "Authentication for {} failed: {e}", entry.url);
            return WorkerOutcome::Failed(e);
        }
    };
    ctx.pipeline.session.install(artifacts);

    match ctx.pipeline.process(&entry, &ctx.goal).await {
        Ok((page, links)) => WorkerOutcome::Page(Box::new(page), links),
        Err(e) => WorkerOutcome::Failed(e),
    }
}
