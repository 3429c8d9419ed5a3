use std::io::ErrorKind;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::StorageResult;
use crate::config::{compute_fingerprint, CrawlerConfig};

/// Status of the most recent crawl run in a state directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

/// Metadata stored next to the query log
///
/// The fingerprint covers the settings that shape the frontier (threshold and
/// alphabet). Resuming with a different fingerprint is allowed but mixes two
/// traversal policies in one log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Manifest {
    pub fingerprint: String,
    pub min_priority: i16,
    pub alphabet: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_resumed_at: Option<DateTime<Utc>>,
    pub runs: u32,
    pub status: RunStatus,
}

impl Manifest {
    pub fn new(crawler: &CrawlerConfig) -> Self {
        Self {
            fingerprint: compute_fingerprint(crawler),
            min_priority: crawler.min_priority,
            alphabet: crawler.alphabet.clone(),
            created_at: Utc::now(),
            last_resumed_at: None,
            runs: 0,
            status: RunStatus::Running,
        }
    }

    /// Reads the manifest at `path`; `None` if the file does not exist
    pub fn load(path: &Path) -> StorageResult<Option<Self>> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Some(toml::from_str(&content)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: &Path) -> StorageResult<()> {
        let content = toml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn matches(&self, crawler: &CrawlerConfig) -> bool {
        self.fingerprint == compute_fingerprint(crawler)
    }
}
