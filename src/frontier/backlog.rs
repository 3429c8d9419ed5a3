use std::collections::VecDeque;
use std::io;

/// Storage for generated, not yet dequeued queries
///
/// The frontier serializes every call behind its own lock, so implementations
/// need no internal synchronization. Calls run while that lock is held, which
/// is what ties a popped query to its sequence number; a disk-backed backlog
/// therefore does its I/O under the lock and should keep each call to one
/// buffered read or one write.
pub trait Backlog: Send + 'static {
    /// Removes and returns the oldest pending query
    fn pop(&mut self) -> io::Result<Option<String>>;

    /// Appends queries in order
    fn extend(&mut self, queries: Vec<String>) -> io::Result<()>;

    /// Returns true when `pop` would currently return `None`
    fn is_empty(&self) -> bool;
}

/// In-memory FIFO backlog
#[derive(Debug, Default)]
pub struct MemoryBacklog {
    queue: VecDeque<String>,
}

impl MemoryBacklog {
    pub fn new(seeds: Vec<String>) -> Self {
        Self {
            queue: seeds.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

impl Backlog for MemoryBacklog {
    fn pop(&mut self) -> io::Result<Option<String>> {
        Ok(self.queue.pop_front())
    }

    fn extend(&mut self, queries: Vec<String>) -> io::Result<()> {
        self.queue.extend(queries);
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
