//! Crawler module for hint and search fetching
//!
//! This module contains the core crawling logic, including:
//! - HTTP clients for the hint and app-search endpoints
//! - Response decoding (XML property lists and JSON)
//! - The hint crawl worker pool, ephemeral or resumable
//! - The paced search snapshot crawl

mod coordinator;
mod decode;
mod fetcher;
mod search;

pub use coordinator::{Coordinator, CrawlReport};
pub use decode::{decode_hints, decode_search, DecodeError};
pub use fetcher::{
    build_http_client, FetchError, HintSource, HintsClient, SearchClient, SearchSource,
};
pub use search::{SearchCrawl, SearchReport};

use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

use crate::config::Config;
use crate::expansion::ExpansionPolicy;
use crate::frontier::{Frontier, MemoryBacklog, SourcePolicy};
use crate::storage::{LineWriter, ProgressWriter, ResumableStore, RunStatus};
use crate::{streams, HintError};

/// Where a hint crawl reads its seeds and writes its results
#[derive(Debug, Clone, Default)]
pub struct ScrapeOptions {
    /// Resumable state directory; `None` runs an ephemeral crawl
    pub state_dir: Option<PathBuf>,

    /// Seed queries, one per line; stdin when piped
    pub seeds: Option<PathBuf>,

    /// Results file; stdout (ephemeral) or `hints.tsv` in the state directory
    pub output: Option<PathBuf>,

    /// Discard existing state before starting
    pub fresh: bool,
}

/// Runs a complete hint crawl
///
/// This is the main entry point for scraping. It will:
/// 1. Build the HTTP client and the expansion policy
/// 2. Open the state directory (resumable) or build an in-memory frontier
/// 3. Start the single-writer actors for results and progress
/// 4. Run the worker pool until the frontier drains
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `options` - Input, output and state locations
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl completed
/// * `Err(HintError)` - Crawl failed
pub async fn run_scrape(config: &Config, options: ScrapeOptions) -> Result<CrawlReport, HintError> {
    let policy = ExpansionPolicy::from_config(&config.crawler);
    let client = build_http_client(&config.http)?;
    let source = HintsClient::new(client, &config.hints)?;
    let workers = config.crawler.workers as usize;
    let capacity = config.crawler.channel_capacity;

    match options.state_dir {
        Some(dir) => {
            if options.fresh {
                ResumableStore::wipe(&dir)?;
            }

            let seeds_path = options.seeds.clone();
            let default_seeds = policy.seeds();
            let store = ResumableStore::open(&dir, &config.crawler, move || {
                match seeds_path {
                    Some(path) => Ok(streams::read_lines(Some(&path))?.unwrap_or_default()),
                    None => Ok(default_seeds),
                }
            })?;
            if store.is_resumed() && options.seeds.is_some() {
                info!("State directory already seeded; ignoring the seed file");
            }
            info!(
                "{} queries already settled in {}",
                store.settled_count(),
                dir.display()
            );

            let results_path = options.output.unwrap_or_else(|| store.results_path());
            let results = LineWriter::append_file("results", &results_path, capacity).await?;
            let progress = ProgressWriter::open(&store.progress_path(), capacity).await?;

            let coordinator = Coordinator::new(
                source,
                store.into_frontier(),
                policy,
                workers,
                results.sender(),
                Some(progress.sender()),
            );
            let outcome = coordinator.run().await;

            let flushed = results.finish().await;
            let synced = progress.finish().await;
            let status = if outcome.is_ok() && flushed.is_ok() && synced.is_ok() {
                RunStatus::Completed
            } else {
                RunStatus::Failed
            };
            ResumableStore::finish_run(&dir, status)?;

            let report = outcome?;
            flushed?;
            synced?;
            Ok(report)
        }
        None => {
            let frontier = match streams::async_input_reader(options.seeds.as_deref()).await? {
                Some(reader) => Frontier::with_reader(
                    MemoryBacklog::default(),
                    reader,
                    SourcePolicy::Prioritized,
                    capacity,
                ),
                None => Frontier::in_memory(policy.seeds()),
            };

            let results = match options.output.as_deref() {
                Some(path) => LineWriter::append_file("results", path, capacity).await?,
                None => LineWriter::stdout("results", capacity),
            };

            let coordinator =
                Coordinator::new(source, frontier, policy, workers, results.sender(), None);
            let outcome = coordinator.run().await;
            let flushed = results.finish().await;

            let report = outcome?;
            flushed?;
            Ok(report)
        }
    }
}

/// Runs a search snapshot over the terms in `input` (or piped stdin)
pub async fn run_search(
    config: &Config,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<SearchReport, HintError> {
    let reader = streams::async_input_reader(input.as_deref())
        .await?
        .ok_or(HintError::NoInput)?;

    let client = build_http_client(&config.http)?;
    let source = SearchClient::new(client, &config.search)?;
    let capacity = config.crawler.channel_capacity;

    let frontier = Frontier::with_reader(
        MemoryBacklog::default(),
        reader,
        SourcePolicy::BestEffort,
        capacity,
    );
    let snapshot = match output.as_deref() {
        Some(path) => LineWriter::append_file("snapshot", path, capacity).await?,
        None => LineWriter::stdout("snapshot", capacity),
    };

    let crawl = SearchCrawl::new(
        source,
        frontier,
        snapshot.sender(),
        config.search.workers as usize,
        Duration::from_millis(config.search.pacing_ms),
        config.search.max_retries,
    );
    let outcome = crawl.run().await;
    let flushed = snapshot.finish().await;

    let report = outcome?;
    flushed?;
    Ok(report)
}
