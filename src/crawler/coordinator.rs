//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the worker pool that drives a hint crawl:
//! - Pulling tasks from the frontier
//! - Fetching hints and condensing them into a progress mark
//! - Writing results, enqueueing follow-ups and recording the mark
//! - Periodic progress reporting and first-error shutdown

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::crawler::HintSource;
use crate::expansion::{ExpansionPolicy, ProgressMark};
use crate::frontier::{Frontier, Lease};
use crate::records::encode_hints;
use crate::storage::{LineSender, ProgressSender};
use crate::HintError;

/// Tasks between two progress log lines
const PROGRESS_INTERVAL: u64 = 100;

/// Counters of a finished (or failed) crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Tasks that reached a progress mark
    pub settled: u64,

    /// Tasks whose fetch failed; left unsettled for the next run
    pub fetch_failures: u64,

    /// Tasks rejected for breaking a data-integrity assumption
    pub rejected: u64,

    /// Tasks whose children were enqueued
    pub expanded: u64,

    /// Hint records written
    pub hints: u64,
}

#[derive(Default)]
struct Counters {
    settled: AtomicU64,
    fetch_failures: AtomicU64,
    rejected: AtomicU64,
    expanded: AtomicU64,
    hints: AtomicU64,
}

impl Counters {
    fn report(&self) -> CrawlReport {
        CrawlReport {
            settled: self.settled.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            expanded: self.expanded.load(Ordering::Relaxed),
            hints: self.hints.load(Ordering::Relaxed),
        }
    }
}

struct Context<S> {
    source: S,
    frontier: Frontier,
    policy: ExpansionPolicy,
    results: LineSender,
    progress: Option<ProgressSender>,
    counters: Counters,
    started: Instant,
}

/// Main crawler coordinator structure
///
/// Runs a fixed pool of workers over one frontier. The pool size caps the
/// number of outstanding requests.
pub struct Coordinator<S> {
    context: Arc<Context<S>>,
    workers: usize,
}

impl<S: HintSource> Coordinator<S> {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `source` - Where hints are fetched from
    /// * `frontier` - Queue of pending queries, already seeded
    /// * `policy` - Marking and expansion rules
    /// * `workers` - Number of concurrent workers (at least one)
    /// * `results` - Sink for hint record batches
    /// * `progress` - Sink for progress marks, in resumable mode only
    pub fn new(
        source: S,
        frontier: Frontier,
        policy: ExpansionPolicy,
        workers: usize,
        results: LineSender,
        progress: Option<ProgressSender>,
    ) -> Self {
        Self {
            context: Arc::new(Context {
                source,
                frontier,
                policy,
                results,
                progress,
                counters: Counters::default(),
                started: Instant::now(),
            }),
            workers: workers.max(1),
        }
    }

    /// Runs the crawl until the frontier drains
    ///
    /// The first fatal error (a writer or the frontier failing) closes the
    /// frontier, stops the remaining workers and is returned. Fetch failures
    /// are not fatal.
    pub async fn run(self) -> Result<CrawlReport, HintError> {
        info!("Starting hint crawl with {} workers", self.workers);

        let mut workers = JoinSet::new();
        for id in 0..self.workers {
            workers.spawn(worker(id, Arc::clone(&self.context)));
        }

        let mut failure: Option<HintError> = None;
        while let Some(joined) = workers.join_next().await {
            let err = match joined {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e,
                Err(e) if e.is_cancelled() => continue,
                Err(e) => HintError::Join(e),
            };

            error!("Worker failed: {}", err);
            if failure.is_none() {
                self.context.frontier.close();
                workers.abort_all();
                failure = Some(err);
            }
        }

        let report = self.context.counters.report();
        if let Some(err) = failure {
            return Err(err);
        }

        self.context.frontier.drained().await?;

        let elapsed = self.context.started.elapsed();
        info!(
            "Crawl complete: {} tasks settled in {:.1}s ({} fetch failures, {} rejected)",
            report.settled,
            elapsed.as_secs_f64(),
            report.fetch_failures,
            report.rejected
        );
        Ok(report)
    }
}

async fn worker<S: HintSource>(id: usize, context: Arc<Context<S>>) -> Result<(), HintError> {
    while let Some(lease) = context.frontier.pull().await {
        context.process(lease).await?;
    }
    debug!("Worker {} exiting: frontier drained", id);
    Ok(())
}

impl<S: HintSource> Context<S> {
    /// Processes one task
    ///
    /// Order matters for resumption: results are queued first, then the
    /// children are appended, and the mark is written last, so an interrupted
    /// task is simply redone.
    async fn process(&self, lease: Lease) -> Result<(), HintError> {
        let query = lease.query().to_string();
        let sequence = lease.sequence();

        let hints = match self.source.fetch_hints(&query).await {
            Ok(hints) => hints,
            Err(e) => {
                warn!(query = %query, sequence, error = %e, "Failed to fetch hints");
                self.counters.fetch_failures.fetch_add(1, Ordering::Relaxed);
                lease.complete();
                return Ok(());
            }
        };

        let mark = match self.policy.mark(&hints) {
            Ok(mark) => mark,
            Err(e) => {
                warn!(query = %query, sequence, error = %e, "Rejecting response");
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                ProgressMark::Rejected
            }
        };

        if !hints.is_empty() {
            self.results.write(encode_hints(&hints)).await?;
            self.counters
                .hints
                .fetch_add(hints.len() as u64, Ordering::Relaxed);
        }

        let children = self.policy.follow_ups(&query, mark);
        if !children.is_empty() {
            self.counters.expanded.fetch_add(1, Ordering::Relaxed);
        }
        lease.complete_and_push(children)?;

        if let Some(progress) = &self.progress {
            progress.record(sequence, mark).await?;
        }
        debug!(query = %query, sequence, %mark, "Settled");

        let settled = self.counters.settled.fetch_add(1, Ordering::Relaxed) + 1;
        if settled % PROGRESS_INTERVAL == 0 {
            let rate = settled as f64 / self.started.elapsed().as_secs_f64();
            info!(
                "Progress: {} tasks settled, {} in flight, {:.2} tasks/sec",
                settled,
                self.frontier.in_flight(),
                rate
            );
        }

        Ok(())
    }
}
