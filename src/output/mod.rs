//! Output module for crawl summaries
//!
//! This module handles:
//! - Recording crawl statistics for a resumable state directory
//! - Printing them in a human-readable report

pub mod stats;

pub use stats::{load_statistics, print_statistics, CrawlStatistics};
