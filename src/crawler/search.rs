//! App-search snapshot crawl
//!
//! Terms arrive on an external stream and are searched at a paced rate.
//! Failed terms are re-queued as generated work, which the best-effort
//! frontier serves whenever the stream has nothing ready.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::crawler::SearchSource;
use crate::frontier::{Frontier, Lease};
use crate::records::{encode_search_records, SearchRecord};
use crate::storage::LineSender;
use crate::HintError;

/// Counters of a finished search crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchReport {
    /// Terms whose ranking was written (possibly empty)
    pub searched: u64,

    /// Failed attempts that were re-queued
    pub retried: u64,

    /// Terms abandoned after exhausting their retries
    pub abandoned: u64,

    /// Snapshot records written
    pub records: u64,
}

struct Context<S> {
    source: S,
    frontier: Frontier,
    output: LineSender,
    pacing: Duration,
    max_retries: u32,
    attempts: Mutex<HashMap<String, u32>>,
    searched: AtomicU64,
    retried: AtomicU64,
    abandoned: AtomicU64,
    records: AtomicU64,
}

/// Paced worker pool over a best-effort frontier of search terms
pub struct SearchCrawl<S> {
    context: Arc<Context<S>>,
    workers: usize,
}

impl<S: SearchSource> SearchCrawl<S> {
    pub fn new(
        source: S,
        frontier: Frontier,
        output: LineSender,
        workers: usize,
        pacing: Duration,
        max_retries: u32,
    ) -> Self {
        Self {
            context: Arc::new(Context {
                source,
                frontier,
                output,
                pacing,
                max_retries,
                attempts: Mutex::new(HashMap::new()),
                searched: AtomicU64::new(0),
                retried: AtomicU64::new(0),
                abandoned: AtomicU64::new(0),
                records: AtomicU64::new(0),
            }),
            workers: workers.max(1),
        }
    }

    pub async fn run(self) -> Result<SearchReport, HintError> {
        info!(
            "Starting search crawl with {} workers, {:?} between requests",
            self.workers, self.context.pacing
        );

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

            error!("Search worker failed: {}", err);
            if failure.is_none() {
                self.context.frontier.close();
                workers.abort_all();
                failure = Some(err);
            }
        }

        if let Some(err) = failure {
            return Err(err);
        }
        self.context.frontier.drained().await?;

        let ctx = &self.context;
        let report = SearchReport {
            searched: ctx.searched.load(Ordering::Relaxed),
            retried: ctx.retried.load(Ordering::Relaxed),
            abandoned: ctx.abandoned.load(Ordering::Relaxed),
            records: ctx.records.load(Ordering::Relaxed),
        };
        info!(
            "Search complete: {} terms, {} records, {} abandoned",
            report.searched, report.records, report.abandoned
        );
        Ok(report)
    }
}

async fn worker<S: SearchSource>(id: usize, context: Arc<Context<S>>) -> Result<(), HintError> {
    let mut last_request: Option<Instant> = None;

    while let Some(lease) = context.frontier.pull().await {
        if let Some(last) = last_request {
            tokio::time::sleep_until(last + context.pacing).await;
        }
        last_request = Some(Instant::now());
        context.process(lease).await?;
    }

    debug!("Search worker {} exiting: frontier drained", id);
    Ok(())
}

impl<S: SearchSource> Context<S> {
    async fn process(&self, lease: Lease) -> Result<(), HintError> {
        let term = lease.query().to_string();

        match self.source.fetch_ranking(&term).await {
            Ok(bundle_ids) => {
                let records = SearchRecord::from_ranking(&term, &bundle_ids);
                self.output.write(encode_search_records(&records)).await?;
                self.records
                    .fetch_add(records.len() as u64, Ordering::Relaxed);
                self.searched.fetch_add(1, Ordering::Relaxed);
                lease.complete();
            }
            Err(e) => {
                let attempt = {
                    let mut attempts = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);
                    let attempt = attempts.entry(term.clone()).or_insert(0);
                    *attempt += 1;
                    *attempt
                };

                if attempt <= self.max_retries {
                    warn!(
                        "Search for {:?} failed (attempt {}), re-queueing: {}",
                        term, attempt, e
                    );
                    self.retried.fetch_add(1, Ordering::Relaxed);
                    lease.complete_and_push(vec![term])?;
                } else {
                    warn!(
                        "Search for {:?} failed {} times, giving up: {}",
                        term, attempt, e
                    );
                    self.abandoned.fetch_add(1, Ordering::Relaxed);
                    lease.complete();
                }
            }
        }

        Ok(())
    }
}
