use std::io::{ErrorKind, SeekFrom};
use std::path::Path;

use tokio::fs::OpenOptions;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{StorageError, StorageResult};
use crate::expansion::ProgressMark;

/// Bytes per progress slot
pub const SLOT_SIZE: u64 = 2;

/// Point-in-time copy of the progress index
///
/// Slot `n` holds the mark of the query with sequence `n`; zero (or a slot
/// beyond the end of the file) means the query was never settled.
#[derive(Debug, Clone, Default)]
pub struct ProgressSnapshot {
    slots: Vec<i16>,
}

impl ProgressSnapshot {
    /// Loads the index at `path`; a missing file is an empty snapshot
    pub fn load(path: &Path) -> StorageResult<Self> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };

        if bytes.len() % SLOT_SIZE as usize != 0 {
            warn!(
                "Progress index {} has a trailing partial slot; ignoring it",
                path.display()
            );
        }

        Ok(Self::from_bytes(&bytes))
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let slots = bytes
            .chunks_exact(SLOT_SIZE as usize)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Self { slots }
    }

    /// Number of slots in the file, settled or not
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, sequence: u64) -> Option<ProgressMark> {
        let index = usize::try_from(sequence).ok()?;
        self.slots.get(index).copied().and_then(ProgressMark::decode)
    }

    pub fn is_settled(&self, sequence: u64) -> bool {
        self.get(sequence).is_some()
    }

    /// Iterates over `(sequence, mark)` for every settled slot
    pub fn settled(&self) -> impl Iterator<Item = (u64, ProgressMark)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, raw)| ProgressMark::decode(*raw).map(|mark| (i as u64, mark)))
    }
}

/// Single-writer actor owning the progress index file
///
/// Marks arrive from any number of workers through [`ProgressSender`] and
/// are written at `sequence * SLOT_SIZE`; the file is never truncated, so
/// slots of queries that have not settled yet keep reading as zero.
pub struct ProgressWriter {
    tx: mpsc::Sender<(u64, i16)>,
    handle: JoinHandle<StorageResult<u64>>,
}

impl ProgressWriter {
    /// Opens (creating if needed) the index at `path` for positioned writes
    pub async fn open(path: &Path, capacity: usize) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .await?;

        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(run(file, rx));
        Ok(Self { tx, handle })
    }

    pub fn sender(&self) -> ProgressSender {
        ProgressSender {
            tx: self.tx.clone(),
        }
    }

    /// Flushes queued marks, syncs the file and returns the number written
    ///
    /// Senders handed out earlier must be dropped first, or this waits for
    /// them.
    pub async fn finish(self) -> StorageResult<u64> {
        drop(self.tx);
        self.handle
            .await
            .map_err(|e| StorageError::WriterTask("progress index", e))?
    }
}

async fn run(mut file: tokio::fs::File, mut rx: mpsc::Receiver<(u64, i16)>) -> StorageResult<u64> {
    let mut written = 0;
    while let Some((sequence, raw)) = rx.recv().await {
        file.seek(SeekFrom::Start(sequence * SLOT_SIZE)).await?;
        file.write_all(&raw.to_le_bytes()).await?;
        written += 1;
    }

    file.flush().await?;
    file.sync_all().await?;
    debug!("Progress writer finished after {} marks", written);
    Ok(written)
}

/// Cloneable handle for submitting progress marks
#[derive(Clone)]
pub struct ProgressSender {
    tx: mpsc::Sender<(u64, i16)>,
}

impl ProgressSender {
    /// Queues `mark` for the query with `sequence`
    pub async fn record(&self, sequence: u64, mark: ProgressMark) -> StorageResult<()> {
        self.tx
            .send((sequence, mark.encode()))
            .await
            .map_err(|_| StorageError::WriterClosed("progress index"))
    }
}
