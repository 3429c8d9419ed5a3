//! Hint-Ripple main entry point
//!
//! This is the command-line interface for the Hint-Ripple suggestion-space explorer.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hint_ripple::analysis::{diff_snapshots, leaf, sort_hints, terms, uniq};
use hint_ripple::config::{compute_fingerprint, load_config_or_default, validate, Config};
use hint_ripple::crawler::{run_scrape, run_search, ScrapeOptions};
use hint_ripple::index::{LeafWalker, PrefixIndex};
use hint_ripple::output::{load_statistics, print_statistics};
use hint_ripple::records::{read_hints, read_search_records, Hint};
use hint_ripple::streams::{output_writer, require_input};
use tracing_subscriber::EnvFilter;

/// Hint-Ripple: a suggestion-space explorer
///
/// Crawls an autocomplete endpoint breadth-first, drilling into more
/// specific queries while result pages stay saturated, and analyses what
/// the crawl recorded.
#[derive(Parser, Debug)]
#[command(name = "hint-ripple")]
#[command(version)]
#[command(about = "A suggestion-space explorer", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, global = true, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the hint endpoint until the frontier drains
    Scrape {
        /// Minimum mark a query needs to be expanded (overrides the config)
        #[arg(short, long, allow_hyphen_values = true)]
        priority: Option<i16>,

        /// Number of concurrent workers (overrides the config)
        #[arg(short, long)]
        workers: Option<u32>,

        /// Seed queries, one per line (default: piped stdin, else the alphabet)
        #[arg(short, long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Results file (default: stdout, or hints.tsv in the state directory)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Resumable state directory
        #[arg(long, value_name = "DIR")]
        state: Option<PathBuf>,

        /// Discard the state directory's files before starting
        #[arg(long, requires = "state")]
        fresh: bool,

        /// Validate the configuration and show what would be crawled
        #[arg(long)]
        dry_run: bool,
    },

    /// Snapshot app-search rankings for a list of terms
    Search {
        /// Terms, one per line (default: stdin)
        #[arg(short, long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Snapshot file (default: stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Storefront country code (overrides the config)
        #[arg(long)]
        country: Option<String>,
    },

    /// Print hints sorted by term, then query
    Sort {
        /// Hints file (default: stdin)
        input: Option<PathBuf>,
    },

    /// Keep only the highest-priority hint of every term
    Uniq {
        /// Hints file (default: stdin)
        input: Option<PathBuf>,
    },

    /// Keep only the most specific query that found every term
    Leaf {
        /// Hints file (default: stdin)
        input: Option<PathBuf>,
    },

    /// Print the terms of hints at or above a priority
    Terms {
        /// Minimum priority
        #[arg(short, long, default_value_t = 0, allow_hyphen_values = true)]
        priority: i16,

        /// Hints file (default: stdin)
        input: Option<PathBuf>,
    },

    /// Print the records of every leaf query of a results file
    Leaves {
        /// Results file in crawl order (must be seekable)
        input: PathBuf,
    },

    /// Compare two search snapshots
    Diff {
        /// Earlier snapshot
        before: PathBuf,

        /// Later snapshot
        after: PathBuf,
    },

    /// Summarise a resumable crawl directory
    Stats {
        /// State directory
        state: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = load_config_or_default(cli.config.as_deref()).with_context(|| {
        match &cli.config {
            Some(path) => format!("Failed to load configuration from {}", path.display()),
            None => "Invalid default configuration".to_string(),
        }
    })?;
    if let Some(path) = &cli.config {
        tracing::info!("Configuration loaded from {}", path.display());
    }

    match cli.command {
        Command::Scrape {
            priority,
            workers,
            input,
            output,
            state,
            fresh,
            dry_run,
        } => {
            if let Some(priority) = priority {
                config.crawler.min_priority = priority;
            }
            if let Some(workers) = workers {
                config.crawler.workers = workers;
            }
            validate(&config).context("Invalid command-line override")?;

            let options = ScrapeOptions {
                state_dir: state,
                seeds: input,
                output,
                fresh,
            };
            if dry_run {
                handle_dry_run(&config, &options);
                return Ok(());
            }
            handle_scrape(&config, options).await?;
        }
        Command::Search {
            input,
            output,
            country,
        } => {
            if country.is_some() {
                config.search.country = country;
            }
            validate(&config).context("Invalid command-line override")?;

            let report = run_search(&config, input, output)
                .await
                .context("Search failed")?;
            tracing::info!(
                "Searched {} terms ({} retried, {} abandoned)",
                report.searched,
                report.retried,
                report.abandoned
            );
        }
        Command::Sort { input } => {
            let mut hints = load_hints(input.as_deref())?;
            sort_hints(&mut hints);
            write_lines(&hints)?;
        }
        Command::Uniq { input } => {
            let mut hints = load_hints(input.as_deref())?;
            sort_hints(&mut hints);
            write_lines(&uniq(&hints))?;
        }
        Command::Leaf { input } => {
            let mut hints = load_hints(input.as_deref())?;
            sort_hints(&mut hints);
            write_lines(&leaf(&hints))?;
        }
        Command::Terms { priority, input } => {
            let hints = load_hints(input.as_deref())?;
            let mut out = output_writer(None)?;
            for term in terms(&hints, priority) {
                writeln!(out, "{}", term)?;
            }
            out.flush()?;
        }
        Command::Leaves { input } => {
            let index = PrefixIndex::from_file(&input)
                .with_context(|| format!("Failed to index {}", input.display()))?;
            tracing::info!("Indexed {} queries from {}", index.len(), input.display());

            let mut walker = LeafWalker::open(&input)?;
            let mut out = output_writer(None)?;
            let copied = walker.copy_leaves(&index, &mut out)?;
            out.flush()?;
            tracing::info!("Printed {} leaf records", copied);
        }
        Command::Diff { before, after } => {
            let before = load_snapshot(&before)?;
            let after = load_snapshot(&after)?;
            write_lines(&diff_snapshots(before, after))?;
        }
        Command::Stats { state } => {
            let stats = load_statistics(&state, config.crawler.min_priority)
                .with_context(|| format!("Failed to read {}", state.display()))?;
            println!("State directory: {}\n", state.display());
            print_statistics(&stats);
        }
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr; stdout carries command output.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("hint_ripple=info,warn"),
            1 => EnvFilter::new("hint_ripple=debug,info"),
            2 => EnvFilter::new("hint_ripple=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles `scrape --dry-run`: shows the effective settings
fn handle_dry_run(config: &Config, options: &ScrapeOptions) {
    println!("=== Hint-Ripple Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Workers: {}", config.crawler.workers);
    println!("  Min priority: {}", config.crawler.min_priority);
    println!("  Alphabet: {:?}", config.crawler.alphabet);
    println!("  Fingerprint: {}", compute_fingerprint(&config.crawler));

    println!("\nEndpoints:");
    println!("  Hints: {} (media={})", config.hints.url, config.hints.media);
    println!("  User agent: {}", config.http.user_agent);

    println!("\nLocations:");
    match &options.state_dir {
        Some(dir) => println!(
            "  State directory: {}{}",
            dir.display(),
            if options.fresh { " (fresh)" } else { "" }
        ),
        None => println!("  State directory: none (ephemeral crawl)"),
    }
    match &options.seeds {
        Some(path) => println!("  Seeds: {}", path.display()),
        None => println!(
            "  Seeds: stdin if piped, else {} generated queries",
            config.crawler.alphabet.chars().count()
        ),
    }
    match &options.output {
        Some(path) => println!("  Results: {}", path.display()),
        None if options.state_dir.is_some() => {
            println!("  Results: hints.tsv in the state directory")
        }
        None => println!("  Results: stdout"),
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_scrape(config: &Config, options: ScrapeOptions) -> Result<()> {
    match &options.state_dir {
        Some(dir) if options.fresh => {
            tracing::info!("Starting fresh crawl in {}", dir.display())
        }
        Some(dir) => tracing::info!(
            "Starting crawl in {} (will resume if state exists)",
            dir.display()
        ),
        None => tracing::info!("Starting ephemeral crawl"),
    }

    let report = run_scrape(config, options).await.context("Crawl failed")?;
    tracing::info!(
        "Crawl finished: {} settled, {} expanded, {} hints, {} fetch failures, {} rejected",
        report.settled,
        report.expanded,
        report.hints,
        report.fetch_failures,
        report.rejected
    );
    Ok(())
}

fn load_hints(path: Option<&Path>) -> Result<Vec<Hint>> {
    let reader = require_input(path)?;
    let hints = read_hints(reader).context("Malformed hints input")?;
    tracing::debug!("Loaded {} hints", hints.len());
    Ok(hints)
}

fn load_snapshot(path: &Path) -> Result<Vec<hint_ripple::SearchRecord>> {
    let reader = require_input(Some(path))?;
    read_search_records(reader).with_context(|| format!("Malformed snapshot {}", path.display()))
}

fn write_lines<T: std::fmt::Display>(items: &[T]) -> Result<()> {
    let mut out = output_writer(None)?;
    for item in items {
        writeln!(out, "{}", item)?;
    }
    out.flush()?;
    Ok(())
}
