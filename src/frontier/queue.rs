use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::io::AsyncRead;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, error, trace};

use super::stream::pump_lines;
use super::{Backlog, FrontierError, MemoryBacklog, SourcePolicy, Task};

type SettledFilter = Box<dyn Fn(u64) -> bool + Send>;

struct State {
    backlog: Box<dyn Backlog>,
    in_flight: usize,
    next_sequence: u64,
    stream_open: bool,
    drained: bool,
    error: Option<FrontierError>,
    settled: Option<SettledFilter>,
}

impl State {
    /// Latches `drained` once nothing can produce more work
    fn check_drained(&mut self) -> bool {
        if !self.drained && self.in_flight == 0 && !self.stream_open && self.backlog.is_empty() {
            self.drained = true;
        }
        self.drained
    }

    fn is_settled(&self, sequence: u64) -> bool {
        self.settled.as_ref().is_some_and(|settled| settled(sequence))
    }

    fn fail(&mut self, err: FrontierError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
        self.stream_open = false;
        self.drained = true;
    }
}

struct Shared {
    state: Mutex<State>,
    changed: Notify,
    stream: tokio::sync::Mutex<Option<mpsc::Receiver<String>>>,
    policy: SourcePolicy,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Settles one leased task, appending its children first
    fn finish(&self, children: Vec<String>) -> Result<(), FrontierError> {
        let mut state = self.state();
        let pushed = if children.is_empty() {
            Ok(())
        } else {
            state.backlog.extend(children).map_err(FrontierError::Backlog)
        };
        state.in_flight = state.in_flight.saturating_sub(1);
        state.check_drained();
        drop(state);

        self.changed.notify_waiters();
        pushed
    }

    fn stream_closed(&self, err: Option<FrontierError>) {
        let mut state = self.state();
        match err {
            Some(err) => state.fail(err),
            None => {
                state.stream_open = false;
                state.check_drained();
            }
        }
        drop(state);
        self.changed.notify_waiters();
    }
}

enum Taken {
    Leased(Lease),
    Empty,
    Drained,
}

enum Polled {
    Item(String),
    Closed,
}

/// Shared handle to the crawl frontier
///
/// Cloning is cheap; all clones observe the same queue. Every task returned by
/// [`Frontier::pull`] is wrapped in a [`Lease`] that must be settled (by
/// [`Lease::complete_and_push`], or by dropping it) before the frontier can
/// drain.
#[derive(Clone)]
pub struct Frontier {
    shared: Arc<Shared>,
}

impl Frontier {
    /// Creates a frontier over generated work only
    pub fn new(backlog: impl Backlog) -> Self {
        Self::build(Box::new(backlog), None, SourcePolicy::Prioritized)
    }

    /// Creates an in-memory frontier seeded with `seeds`
    pub fn in_memory(seeds: Vec<String>) -> Self {
        Self::new(MemoryBacklog::new(seeds))
    }

    /// Creates a frontier that also consumes an external ordered stream
    ///
    /// The stream counts as exhausted once every sender is dropped.
    pub fn with_stream(
        backlog: impl Backlog,
        stream: mpsc::Receiver<String>,
        policy: SourcePolicy,
    ) -> Self {
        Self::build(Box::new(backlog), Some(stream), policy)
    }

    /// Creates a frontier whose external stream is the lines of `reader`
    ///
    /// Spawns the reading task on the current tokio runtime. A read failure
    /// stops the frontier and is reported by [`Frontier::drained`].
    pub fn with_reader<R>(
        backlog: impl Backlog,
        reader: R,
        policy: SourcePolicy,
        capacity: usize,
    ) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let frontier = Self::with_stream(backlog, rx, policy);

        let shared = Arc::downgrade(&frontier.shared);
        tokio::spawn(async move {
            match pump_lines(reader, tx).await {
                Ok(lines) => debug!("Input stream exhausted after {} lines", lines),
                Err(e) => {
                    error!("Failed to read input stream: {}", e);
                    if let Some(shared) = shared.upgrade() {
                        shared.stream_closed(Some(FrontierError::Stream(e)));
                    }
                }
            }
        });

        frontier
    }

    fn build(
        backlog: Box<dyn Backlog>,
        stream: Option<mpsc::Receiver<String>>,
        policy: SourcePolicy,
    ) -> Self {
        let state = State {
            backlog,
            in_flight: 0,
            next_sequence: 0,
            stream_open: stream.is_some(),
            drained: false,
            error: None,
            settled: None,
        };

        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                changed: Notify::new(),
                stream: tokio::sync::Mutex::new(stream),
                policy,
            }),
        }
    }

    /// Skips queries whose sequence number `settled` reports as already done
    ///
    /// Skipped queries consume their sequence number but are never leased, and
    /// therefore produce no children.
    pub fn skip_settled(self, settled: impl Fn(u64) -> bool + Send + 'static) -> Self {
        self.shared.state().settled = Some(Box::new(settled));
        self
    }

    /// Waits for the next task
    ///
    /// Returns `None` only once the frontier has drained: the stream is
    /// exhausted or closed, the backlog is empty and no lease is outstanding.
    pub async fn pull(&self) -> Option<Lease> {
        let shared = &self.shared;

        loop {
            let notified = shared.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let stream_open = shared.state().stream_open;
            if !stream_open {
                self.release_stream();
            }

            if stream_open {
                match shared.policy {
                    SourcePolicy::Prioritized => {
                        tokio::select! {
                            polled = self.recv_stream() => {
                                if let Polled::Item(query) = polled {
                                    if let Some(lease) = self.lease_streamed(query) {
                                        return Some(lease);
                                    }
                                }
                            }
                            _ = &mut notified => {}
                        }
                        continue;
                    }
                    SourcePolicy::BestEffort => {
                        if let Some(query) = self.try_recv_stream() {
                            if let Some(lease) = self.lease_streamed(query) {
                                return Some(lease);
                            }
                            continue;
                        }
                    }
                }
            }

            match self.take_from_backlog() {
                Taken::Leased(lease) => return Some(lease),
                Taken::Drained => return None,
                Taken::Empty => {}
            }

            if stream_open {
                tokio::select! {
                    polled = self.recv_stream() => {
                        if let Polled::Item(query) = polled {
                            if let Some(lease) = self.lease_streamed(query) {
                                return Some(lease);
                            }
                        }
                    }
                    _ = &mut notified => {}
                }
            } else {
                notified.await;
            }
        }
    }

    /// Stops accepting items from the external stream
    ///
    /// Tasks already in the backlog and leased tasks still run to completion,
    /// so closing is graceful. Idempotent.
    pub fn close(&self) {
        let shared = &self.shared;
        shared.stream_closed(None);
        self.release_stream();
        debug!("Frontier closed");
    }

    /// Waits until the frontier has drained
    ///
    /// Returns the first backlog or stream error encountered, if any.
    pub async fn drained(&self) -> Result<(), FrontierError> {
        loop {
            let notified = self.shared.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.shared.state();
                if state.check_drained() {
                    return match state.error.take() {
                        Some(err) => Err(err),
                        None => Ok(()),
                    };
                }
            }

            notified.await;
        }
    }

    /// Number of leased tasks not yet settled
    pub fn in_flight(&self) -> usize {
        self.shared.state().in_flight
    }

    pub fn is_drained(&self) -> bool {
        self.shared.state().drained
    }

    /// Drops the stream receiver once the stream no longer counts as open,
    /// so the producer's sends fail instead of waiting for capacity
    ///
    /// A worker blocked in [`Frontier::recv_stream`] holds the lock; it
    /// releases it when woken and the next pull retries.
    fn release_stream(&self) {
        if let Ok(mut stream) = self.shared.stream.try_lock() {
            if stream.take().is_some() {
                trace!("Released the input stream");
            }
        }
    }

    async fn recv_stream(&self) -> Polled {
        let mut guard = self.shared.stream.lock().await;
        if !self.shared.state().stream_open {
            guard.take();
            return Polled::Closed;
        }
        let Some(rx) = guard.as_mut() else {
            return Polled::Closed;
        };

        match rx.recv().await {
            Some(query) => Polled::Item(query),
            None => {
                guard.take();
                drop(guard);
                self.shared.stream_closed(None);
                Polled::Closed
            }
        }
    }

    fn try_recv_stream(&self) -> Option<String> {
        // Another worker is already waiting on the stream
        let mut guard = self.shared.stream.try_lock().ok()?;
        let rx = guard.as_mut()?;

        match rx.try_recv() {
            Ok(query) => Some(query),
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                guard.take();
                drop(guard);
                self.shared.stream_closed(None);
                None
            }
        }
    }

    fn lease_streamed(&self, query: String) -> Option<Lease> {
        let mut state = self.shared.state();
        if state.drained {
            debug!("Dropping streamed query {:?} received after drain", query);
            return None;
        }

        let sequence = state.next_sequence;
        state.next_sequence += 1;
        if state.is_settled(sequence) {
            trace!("Skipping settled query {} ({:?})", sequence, query);
            return None;
        }

        state.in_flight += 1;
        Some(Lease::new(Task { query, sequence }, Arc::clone(&self.shared)))
    }

    fn take_from_backlog(&self) -> Taken {
        let mut state = self.shared.state();
        if state.drained {
            return Taken::Drained;
        }

        loop {
            match state.backlog.pop() {
                Ok(Some(query)) => {
                    let sequence = state.next_sequence;
                    state.next_sequence += 1;
                    if state.is_settled(sequence) {
                        trace!("Skipping settled query {} ({:?})", sequence, query);
                        continue;
                    }

                    state.in_flight += 1;
                    return Taken::Leased(Lease::new(
                        Task { query, sequence },
                        Arc::clone(&self.shared),
                    ));
                }
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to read from the backlog: {}", e);
                    state.fail(FrontierError::Backlog(e));
                    drop(state);
                    self.shared.changed.notify_waiters();
                    return Taken::Drained;
                }
            }
        }

        if state.check_drained() {
            drop(state);
            self.shared.changed.notify_waiters();
            Taken::Drained
        } else {
            Taken::Empty
        }
    }
}

/// A task leased to one worker
///
/// Dropping an unsettled lease completes it without children, so a worker
/// that bails out early never wedges the frontier.
pub struct Lease {
    task: Task,
    shared: Arc<Shared>,
    settled: bool,
}

impl Lease {
    fn new(task: Task, shared: Arc<Shared>) -> Self {
        Self {
            task,
            shared,
            settled: false,
        }
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn query(&self) -> &str {
        &self.task.query
    }

    pub fn sequence(&self) -> u64 {
        self.task.sequence
    }

    /// Settles the task without follow-up work
    pub fn complete(self) {
        // Drop does the work
    }

    /// Appends `children` to the backlog and settles the task, atomically
    /// with respect to the drain check
    ///
    /// The task is settled even when appending fails.
    pub fn complete_and_push(mut self, children: Vec<String>) -> Result<(), FrontierError> {
        self.settled = true;
        self.shared.finish(children)
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if !self.settled {
            self.settled = true;
            let _ = self.shared.finish(Vec::new());
        }
    }
}

impl std::fmt::Debug for Lease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lease").field("task", &self.task).finish()
    }
}
