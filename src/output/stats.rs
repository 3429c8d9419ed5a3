//! Statistics generation from a crawl state directory
//!
//! This module provides functionality for summarising a resumable crawl:
//! how much of the query log is settled, and how the settled queries split
//! across progress mark kinds.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, ErrorKind};
use std::path::Path;

use crate::storage::{
    Manifest, ProgressSnapshot, StorageResult, MANIFEST, PROGRESS_INDEX, QUERY_LOG, RESULTS_LOG,
};

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Queries in the query log
    pub queries_logged: u64,

    /// Logged queries whose progress slot holds a mark
    pub settled: u64,

    /// Count of settled queries by mark kind
    pub marks_by_kind: BTreeMap<&'static str, u64>,

    /// Settled queries whose children were generated
    pub expanded: u64,

    /// Lines in the state directory's results log, if it exists
    pub results: Option<u64>,

    /// Manifest of the state directory, if present
    pub manifest: Option<Manifest>,
}

impl CrawlStatistics {
    /// Logged queries not settled yet
    pub fn pending(&self) -> u64 {
        self.queries_logged.saturating_sub(self.settled)
    }
}

/// Loads statistics from a state directory
///
/// # Arguments
///
/// * `dir` - The state directory of a resumable crawl
/// * `threshold` - Expansion threshold used to count expanded queries when the
///   directory has no manifest; otherwise the crawl's recorded min-priority wins
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to read a state file
pub fn load_statistics(dir: &Path, threshold: i16) -> StorageResult<CrawlStatistics> {
    let queries_logged = count_lines(&dir.join(QUERY_LOG))?.unwrap_or(0);
    let progress = ProgressSnapshot::load(&dir.join(PROGRESS_INDEX))?;
    let manifest = Manifest::load(&dir.join(MANIFEST))?;
    let threshold = manifest.as_ref().map_or(threshold, |m| m.min_priority);

    let mut settled = 0;
    let mut expanded = 0;
    let mut marks_by_kind = BTreeMap::new();
    for (_, mark) in progress
        .settled()
        .take_while(|(sequence, _)| *sequence < queries_logged)
    {
        settled += 1;
        *marks_by_kind.entry(mark.kind()).or_insert(0) += 1;
        if crate::expansion::should_expand(mark, threshold) {
            expanded += 1;
        }
    }

    Ok(CrawlStatistics {
        queries_logged,
        settled,
        marks_by_kind,
        expanded,
        results: count_lines(&dir.join(RESULTS_LOG))?,
        manifest,
    })
}

fn count_lines(path: &Path) -> io::Result<Option<u64>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    let mut reader = BufReader::new(file);
    let mut count = 0;
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            break;
        }
        count += buf.iter().filter(|b| **b == b'\n').count() as u64;
        let consumed = buf.len();
        reader.consume(consumed);
    }
    Ok(Some(count))
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Queries logged: {}", stats.queries_logged);
    println!("  Settled: {}", stats.settled);
    println!("  Pending: {}", stats.pending());
    println!("  Expanded: {}", stats.expanded);
    if let Some(results) = stats.results {
        println!("  Result records: {}", results);
    }
    println!();

    println!("Marks by Kind:");
    let mut kind_counts: Vec<_> = stats.marks_by_kind.iter().collect();
    kind_counts.sort_by(|a, b| b.1.cmp(a.1));

    for (kind, count) in kind_counts {
        let percentage = if stats.settled > 0 {
            (*count as f64 / stats.settled as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", kind, count, percentage);
    }
    println!();

    if let Some(manifest) = &stats.manifest {
        println!("Manifest:");
        println!("  Fingerprint: {}", manifest.fingerprint);
        println!(
            "  Settings: min-priority {}, alphabet {:?}",
            manifest.min_priority, manifest.alphabet
        );
        println!("  Created: {}", manifest.created_at.to_rfc3339());
        if let Some(resumed) = manifest.last_resumed_at {
            println!("  Last resumed: {}", resumed.to_rfc3339());
        }
        println!("  Runs: {} (last: {:?})", manifest.runs, manifest.status);
        println!();
    }

    let completion = if stats.queries_logged > 0 {
        (stats.settled as f64 / stats.queries_logged as f64) * 100.0
    } else {
        0.0
    };
    println!("Completion: {:.1}%", completion);
}
