//! Crawl frontier: a concurrent, unbounded FIFO of pending queries
//!
//! This module contains:
//! - The [`Frontier`] queue shared by all workers, with leases that must be
//!   completed before the queue can drain
//! - [`Backlog`] storage for generated work (in memory, or the on-disk query log)
//! - Composition with an external ordered input stream, either read first
//!   ([`SourcePolicy::Prioritized`]) or opportunistically preferred
//!   ([`SourcePolicy::BestEffort`])
//!
//! Draining is a fixed point: the queue only reports "no more work" once the
//! stream is exhausted, the backlog is empty and no leased task is in flight,
//! because every in-flight task may still push children.

mod backlog;
mod queue;
mod stream;

pub use backlog::{Backlog, MemoryBacklog};
pub use queue::{Frontier, Lease};
pub use stream::pump_lines;

use thiserror::Error;

/// A unit of crawl work handed to a worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// The query to fetch
    pub query: String,

    /// Monotonic index assigned at dequeue time; the progress index slot
    pub sequence: u64,
}

/// How an external input stream is combined with generated work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourcePolicy {
    /// Drain the stream completely before touching generated work
    Prioritized,

    /// Prefer the stream when it has an item ready, otherwise take generated
    /// work, and wait on whichever produces first
    BestEffort,
}

/// Errors surfaced by the frontier
#[derive(Debug, Error)]
pub enum FrontierError {
    #[error("backlog IO error: {0}")]
    Backlog(#[source] std::io::Error),

    #[error("input stream error: {0}")]
    Stream(#[source] std::io::Error),
}
