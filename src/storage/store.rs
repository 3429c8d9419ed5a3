use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{info, warn};

use super::{
    Manifest, ProgressSnapshot, QueryLog, RunStatus, StorageResult, MANIFEST, PROGRESS_INDEX,
    QUERY_LOG, RESULTS_LOG,
};
use crate::config::CrawlerConfig;
use crate::frontier::Frontier;

/// A resumable crawl state directory
///
/// Opening the store seeds a fresh query log, loads the progress index as a
/// snapshot and updates the manifest. The frontier built from it replays the
/// query log from the start and skips every sequence the snapshot reports as
/// settled, so an interrupted crawl resumes where it stopped.
pub struct ResumableStore {
    dir: PathBuf,
    query_log: QueryLog,
    progress: ProgressSnapshot,
    manifest: Manifest,
    resumed: bool,
}

impl ResumableStore {
    /// Opens or initializes the state directory `dir`
    ///
    /// # Arguments
    ///
    /// * `dir` - State directory, created if missing
    /// * `crawler` - Crawl settings, fingerprinted into the manifest
    /// * `seeds` - Called only when the query log is empty, to produce the
    ///   initial frontier
    pub fn open<F>(dir: &Path, crawler: &CrawlerConfig, seeds: F) -> StorageResult<Self>
    where
        F: FnOnce() -> io::Result<Vec<String>>,
    {
        std::fs::create_dir_all(dir)?;

        let mut query_log = QueryLog::open(&dir.join(QUERY_LOG))?;
        let resumed = !query_log.is_fresh();
        if resumed {
            info!("Resuming crawl from {}", dir.display());
        } else {
            let seeds = seeds()?;
            info!("Seeding new crawl in {} with {} queries", dir.display(), seeds.len());
            query_log.append(&seeds)?;
        }

        let progress = ProgressSnapshot::load(&dir.join(PROGRESS_INDEX))?;

        let manifest_path = dir.join(MANIFEST);
        let mut manifest = match Manifest::load(&manifest_path)? {
            Some(manifest) => {
                if !manifest.matches(crawler) {
                    warn!(
                        "Crawl settings changed since this state directory was created \
                         (min-priority {} -> {}, alphabet {:?} -> {:?}); resuming anyway",
                        manifest.min_priority,
                        crawler.min_priority,
                        manifest.alphabet,
                        crawler.alphabet
                    );
                }
                if manifest.status == RunStatus::Running {
                    info!("Previous run did not finish cleanly");
                }
                manifest
            }
            None => Manifest::new(crawler),
        };

        if manifest.runs > 0 {
            manifest.last_resumed_at = Some(Utc::now());
        }
        manifest.runs += 1;
        manifest.status = RunStatus::Running;
        manifest.save(&manifest_path)?;

        Ok(Self {
            dir: dir.to_path_buf(),
            query_log,
            progress,
            manifest,
            resumed,
        })
    }

    /// Removes every state file from `dir`, keeping the directory itself
    pub fn wipe(dir: &Path) -> StorageResult<()> {
        for name in [QUERY_LOG, PROGRESS_INDEX, RESULTS_LOG, MANIFEST] {
            match std::fs::remove_file(dir.join(name)) {
                Ok(()) => info!("Removed {}", dir.join(name).display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_resumed(&self) -> bool {
        self.resumed
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Number of query-log sequences already settled
    pub fn settled_count(&self) -> usize {
        self.progress.settled().count()
    }

    pub fn results_path(&self) -> PathBuf {
        self.dir.join(RESULTS_LOG)
    }

    pub fn progress_path(&self) -> PathBuf {
        self.dir.join(PROGRESS_INDEX)
    }

    /// Records the outcome of the run in the manifest
    pub fn finish_run(dir: &Path, status: RunStatus) -> StorageResult<()> {
        let path = dir.join(MANIFEST);
        if let Some(mut manifest) = Manifest::load(&path)? {
            manifest.status = status;
            manifest.save(&path)?;
        }
        Ok(())
    }

    /// Turns the store into the frontier over its query log
    pub fn into_frontier(self) -> Frontier {
        let progress = self.progress;
        Frontier::new(self.query_log).skip_settled(move |sequence| progress.is_settled(sequence))
    }
}
