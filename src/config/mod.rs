//! Configuration module for Hint-Ripple
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key has a default, so the crawler also runs without a file.
//!
//! # Example
//!
//! ```no_run
//! use hint_ripple::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("hint-ripple.toml")).unwrap();
//! println!("Crawler will run {} workers", config.crawler.workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, HintsConfig, HttpConfig, SearchConfig, DEFAULT_ALPHABET,
};

// Re-export parser functions
pub use parser::{compute_fingerprint, load_config, load_config_or_default, parse_config};
pub use validation::validate;
