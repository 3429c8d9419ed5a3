use std::path::Path;

use tokio::fs::OpenOptions;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::{StorageError, StorageResult};

/// Single-writer actor for a line-oriented output sink
///
/// Workers submit pre-encoded batches of complete lines; each batch is written
/// and flushed as one unit, so lines from concurrent workers never interleave.
pub struct LineWriter {
    name: &'static str,
    tx: mpsc::Sender<Vec<u8>>,
    handle: JoinHandle<StorageResult<u64>>,
}

impl LineWriter {
    /// Spawns the actor over an arbitrary async sink
    pub fn spawn<W>(name: &'static str, sink: W, capacity: usize) -> Self
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(run(name, sink, rx));
        Self { name, tx, handle }
    }

    /// Spawns the actor appending to the file at `path`, creating it if needed
    pub async fn append_file(name: &'static str, path: &Path, capacity: usize) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        Ok(Self::spawn(name, file, capacity))
    }

    /// Spawns the actor writing to standard output
    pub fn stdout(name: &'static str, capacity: usize) -> Self {
        Self::spawn(name, tokio::io::stdout(), capacity)
    }

    pub fn sender(&self) -> LineSender {
        LineSender {
            name: self.name,
            tx: self.tx.clone(),
        }
    }

    /// Drains queued batches and returns the number of bytes written
    ///
    /// Senders handed out earlier must be dropped first, or this waits for
    /// them.
    pub async fn finish(self) -> StorageResult<u64> {
        drop(self.tx);
        self.handle
            .await
            .map_err(|e| StorageError::WriterTask(self.name, e))?
    }
}

async fn run<W>(name: &'static str, mut sink: W, mut rx: mpsc::Receiver<Vec<u8>>) -> StorageResult<u64>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0u64;
    while let Some(batch) = rx.recv().await {
        sink.write_all(&batch).await?;
        sink.flush().await?;
        written += batch.len() as u64;
    }

    sink.shutdown().await?;
    debug!("{} writer finished after {} bytes", name, written);
    Ok(written)
}

/// Cloneable handle for submitting batches to a [`LineWriter`]
#[derive(Clone)]
pub struct LineSender {
    name: &'static str,
    tx: mpsc::Sender<Vec<u8>>,
}

impl LineSender {
    /// Queues one batch of complete lines
    pub async fn write(&self, batch: Vec<u8>) -> StorageResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.tx
            .send(batch)
            .await
            .map_err(|_| StorageError::WriterClosed(self.name))
    }
}
