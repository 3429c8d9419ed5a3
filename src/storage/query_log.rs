use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::frontier::Backlog;

/// Append-only, line-delimited log of every enqueued query
///
/// The log is read and appended through two independent handles: the read
/// cursor walks it front to back while workers append children at the end.
/// The zero-based line index of a query is its task sequence number, so the
/// log must only ever be appended to.
///
/// As a [`Backlog`] it is driven under the frontier's lock with blocking
/// `std::fs` calls: pops are served from the read buffer and each append is
/// a single `write_all` of the whole batch.
#[derive(Debug)]
pub struct QueryLog {
    path: PathBuf,
    reader: BufReader<File>,
    writer: File,
    read_pos: u64,
    len: u64,
}

impl QueryLog {
    /// Opens (creating if needed) the log at `path` with the cursor at its start
    ///
    /// A torn final line left by an interrupted append is terminated so that
    /// later appends start on a fresh line.
    pub fn open(path: &Path) -> io::Result<Self> {
        let mut writer = OpenOptions::new().create(true).append(true).open(path)?;
        let mut len = writer.metadata()?.len();

        if len > 0 {
            let mut probe = File::open(path)?;
            probe.seek(SeekFrom::End(-1))?;
            let mut last = [0u8; 1];
            probe.read_exact(&mut last)?;
            if last[0] != b'\n' {
                tracing::warn!("Query log {} ends with a partial line; terminating it", path.display());
                writer.write_all(b"\n")?;
                len += 1;
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(File::open(path)?),
            writer,
            read_pos: 0,
            len,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when nothing was ever written to the log
    pub fn is_fresh(&self) -> bool {
        self.len == 0
    }

    /// Bytes written so far
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Appends `queries`, one per line, in a single write
    pub fn append(&mut self, queries: &[String]) -> io::Result<()> {
        if queries.is_empty() {
            return Ok(());
        }

        let mut buf = Vec::with_capacity(queries.iter().map(|q| q.len() + 1).sum());
        for query in queries {
            buf.extend_from_slice(query.as_bytes());
            buf.push(b'\n');
        }

        self.writer.write_all(&buf)?;
        self.len += buf.len() as u64;
        Ok(())
    }
}

impl Backlog for QueryLog {
    fn pop(&mut self) -> io::Result<Option<String>> {
        if self.read_pos >= self.len {
            return Ok(None);
        }

        let mut line = String::new();
        let read = self.reader.read_line(&mut line)?;
        if read == 0 {
            return Ok(None);
        }
        self.read_pos += read as u64;

        if line.ends_with('\n') {
            line.pop();
        }
        Ok(Some(line))
    }

    fn extend(&mut self, queries: Vec<String>) -> io::Result<()> {
        self.append(&queries)
    }

    fn is_empty(&self) -> bool {
        self.read_pos >= self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontier::Frontier;
    use tempfile::TempDir;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_sequences_match_line_index_under_concurrent_pushes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("queries.txt");
        let mut log = QueryLog::open(&path).unwrap();
        log.append(&["r".to_string()]).unwrap();

        let frontier = Frontier::new(log);
        let mut workers = tokio::task::JoinSet::new();
        for _ in 0..4 {
            let frontier = frontier.clone();
            workers.spawn(async move {
                let mut seen = Vec::new();
                while let Some(lease) = frontier.pull().await {
                    let query = lease.query().to_string();
                    seen.push((lease.sequence(), query.clone()));
                    let children = if query.len() < 4 {
                        vec![format!("{query}a"), format!("{query}b")]
                    } else {
                        Vec::new()
                    };
                    lease.complete_and_push(children).unwrap();
                }
                seen
            });
        }

        let mut seen = Vec::new();
        while let Some(joined) = workers.join_next().await {
            seen.extend(joined.unwrap());
        }
        seen.sort();

        let lines: Vec<String> = std::fs::read_to_string(&path)
            .unwrap()
            .lines()
            .map(String::from)
            .collect();
        assert_eq!(lines.len(), 15);
        assert_eq!(seen.len(), lines.len());
        for (sequence, query) in seen {
            assert_eq!(lines[sequence as usize], query);
        }
    }

    #[test]
    fn test_append_then_pop_in_order() {
        let dir = TempDir::new().unwrap();
        let mut log = QueryLog::open(&dir.path().join("queries.txt")).unwrap();
        assert!(log.is_fresh());
        assert!(log.is_empty());

        log.append(&["a".to_string(), "b".to_string()]).unwrap();
        assert_eq!(log.pop().unwrap().as_deref(), Some("a"));

        log.extend(vec!["a ".to_string()]).unwrap();
        assert_eq!(log.pop().unwrap().as_deref(), Some("b"));
        assert_eq!(log.pop().unwrap().as_deref(), Some("a "));
        assert_eq!(log.pop().unwrap(), None);
        assert!(log.is_empty());
    }

    #[test]
    fn test_reopen_reads_from_start() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("queries.txt");
        {
            let mut log = QueryLog::open(&path).unwrap();
            log.append(&["x".to_string(), "y".to_string()]).unwrap();
        }

        let mut log = QueryLog::open(&path).unwrap();
        assert!(!log.is_fresh());
        assert_eq!(log.pop().unwrap().as_deref(), Some("x"));
        assert_eq!(log.pop().unwrap().as_deref(), Some("y"));
        assert_eq!(log.pop().unwrap(), None);
    }

    #[test]
    fn test_partial_last_line_is_terminated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("queries.txt");
        std::fs::write(&path, "done\ntor").unwrap();

        let mut log = QueryLog::open(&path).unwrap();
        log.append(&["next".to_string()]).unwrap();

        assert_eq!(log.pop().unwrap().as_deref(), Some("done"));
        assert_eq!(log.pop().unwrap().as_deref(), Some("tor"));
        assert_eq!(log.pop().unwrap().as_deref(), Some("next"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "done\ntor\nnext\n");
    }
}
