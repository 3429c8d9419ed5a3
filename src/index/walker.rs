use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::warn;

use super::{PrefixIndex, TrieNode};
use crate::records::query_field;
use crate::RecordResult;

/// Streams the result block of each indexed leaf out of the results file
pub struct LeafWalker<R> {
    reader: BufReader<R>,
    line: Vec<u8>,
}

impl LeafWalker<File> {
    pub fn open(path: &Path) -> RecordResult<Self> {
        Ok(Self::new(File::open(path)?))
    }
}

impl<R: Read + Seek> LeafWalker<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            line: Vec::new(),
        }
    }

    /// Copies the contiguous records of `leaf`'s query to `out`
    ///
    /// Starts at the leaf's recorded offset and stops at the first record of
    /// another query. Returns the number of records copied.
    pub fn copy_block<W: Write>(&mut self, leaf: &TrieNode, out: &mut W) -> RecordResult<usize> {
        let Some(offset) = leaf.offset() else {
            return Ok(0);
        };
        self.reader.seek(SeekFrom::Start(offset))?;

        let mut copied = 0;
        loop {
            self.line.clear();
            if self.reader.read_until(b'\n', &mut self.line)? == 0 {
                break;
            }

            let record = self.line.strip_suffix(b"\n").unwrap_or(&self.line);
            if query_field(record) != Some(leaf.label()) {
                break;
            }

            out.write_all(record)?;
            out.write_all(b"\n")?;
            copied += 1;
        }

        if copied == 0 {
            warn!(
                "No records for {:?} at offset {}; was the file modified after indexing?",
                String::from_utf8_lossy(leaf.label()),
                offset
            );
        }
        Ok(copied)
    }

    /// Copies the blocks of every leaf of `index`, in level order
    pub fn copy_leaves<W: Write>(&mut self, index: &PrefixIndex, out: &mut W) -> RecordResult<usize> {
        let mut total = 0;
        index.try_walk_leaves(|leaf| -> RecordResult<()> {
            total += self.copy_block(leaf, out)?;
            Ok(())
        })?;
        Ok(total)
    }
}
