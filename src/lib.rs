//! Hint-Ripple: a suggestion-space explorer
//!
//! This crate crawls a remote autocomplete endpoint breadth-first, drilling into
//! more specific queries while result pages stay saturated, and ships the batch
//! tools used to analyse what the crawl recorded.

pub mod analysis;
pub mod config;
pub mod crawler;
pub mod expansion;
pub mod frontier;
pub mod index;
pub mod output;
pub mod records;
pub mod storage;
pub mod streams;

use thiserror::Error;

/// Main error type for Hint-Ripple operations
#[derive(Debug, Error)]
pub enum HintError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    #[error("Data integrity error: {0}")]
    Integrity(#[from] expansion::IntegrityError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Frontier error: {0}")]
    Frontier(#[from] frontier::FrontierError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No input: pass a file path or pipe data on stdin")]
    NoInput,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised while decoding persisted tab-separated records
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("line {line_no}: expected {expected} tab-separated fields: {line:?}")]
    Malformed {
        line_no: usize,
        expected: usize,
        line: String,
    },

    #[error("line {line_no}: bad priority {value:?}: {line:?}")]
    BadPriority {
        line_no: usize,
        value: String,
        line: String,
    },

    #[error("line {line_no}: bad position {value:?}: {line:?}")]
    BadPosition {
        line_no: usize,
        value: String,
        line: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Hint-Ripple operations
pub type Result<T> = std::result::Result<T, HintError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for record decoding
pub type RecordResult<T> = std::result::Result<T, RecordError>;

// Re-export commonly used types
pub use config::Config;
pub use expansion::{ExpansionPolicy, ProgressMark};
pub use frontier::{Frontier, Lease, SourcePolicy, Task};
pub use records::{Hint, SearchRecord};
