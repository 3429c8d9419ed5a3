//! Storage module for persisting crawl data
//!
//! This module handles every file the crawler writes, including:
//! - The append-only query log that doubles as the resumable frontier
//! - The positional progress index (one 2-byte mark per query sequence)
//! - Single-writer actors that serialize appends from concurrent workers
//! - The state-directory manifest used to detect configuration drift
//!
//! A resumable state directory contains:
//!
//! | File | Content |
//! |------|---------|
//! | `queries.txt` | every query ever enqueued, one per line; line index = sequence |
//! | `queries.txt.idx` | little-endian `i16` progress mark per sequence |
//! | `hints.tsv` | `priority\tquery\tterm` result lines |
//! | `manifest.toml` | fingerprint, timestamps, run count |

mod manifest;
mod progress;
mod query_log;
mod store;
mod writer;

pub use manifest::{Manifest, RunStatus};
pub use progress::{ProgressSender, ProgressSnapshot, ProgressWriter, SLOT_SIZE};
pub use query_log::QueryLog;
pub use store::ResumableStore;
pub use writer::{LineSender, LineWriter};

use thiserror::Error;

/// Query log file name inside a state directory
pub const QUERY_LOG: &str = "queries.txt";

/// Progress index file name inside a state directory
pub const PROGRESS_INDEX: &str = "queries.txt.idx";

/// Default results file name inside a state directory
pub const RESULTS_LOG: &str = "hints.tsv";

/// Manifest file name inside a state directory
pub const MANIFEST: &str = "manifest.toml";

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} writer is closed")]
    WriterClosed(&'static str),

    #[error("{0} writer task failed: {1}")]
    WriterTask(&'static str, #[source] tokio::task::JoinError),

    #[error("Failed to parse manifest: {0}")]
    ManifestParse(#[from] toml::de::Error),

    #[error("Failed to serialize manifest: {0}")]
    ManifestSerialize(#[from] toml::ser::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
