use std::collections::{BTreeMap, VecDeque};
use std::convert::Infallible;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::debug;

use crate::records::query_field;
use crate::{RecordError, RecordResult};

/// One node of the prefix index
///
/// The node at depth `d` stands for the first `d` bytes of a query.
/// Children are keyed by their next byte and kept in byte order.
#[derive(Debug, Default)]
pub struct TrieNode {
    label: Vec<u8>,
    offset: Option<u64>,
    children: BTreeMap<u8, TrieNode>,
}

impl TrieNode {
    fn child(label: &[u8]) -> Self {
        Self {
            label: label.to_vec(),
            ..Self::default()
        }
    }

    /// The query bytes this node stands for
    pub fn label(&self) -> &[u8] {
        &self.label
    }

    pub fn depth(&self) -> usize {
        self.label.len()
    }

    /// Byte offset of the first record of this node's query, if the query
    /// itself appeared in the file
    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn children(&self) -> impl Iterator<Item = &TrieNode> {
        self.children.values()
    }
}

/// Sparse byte trie of the queries in a results file
#[derive(Debug, Default)]
pub struct PrefixIndex {
    root: TrieNode,
    queries: usize,
}

impl PrefixIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the index of the results file at `path`
    pub fn from_file(path: &Path) -> RecordResult<Self> {
        Self::build(BufReader::new(File::open(path)?))
    }

    /// Builds the index from result records, tracking each line's byte offset
    ///
    /// A query whose path already exists (because it was seen before, or
    /// because a longer query already created it) is skipped.
    pub fn build<R: BufRead>(mut reader: R) -> RecordResult<Self> {
        let mut index = Self::new();
        let mut line = Vec::new();
        let mut previous: Vec<u8> = Vec::new();
        let mut offset = 0u64;
        let mut line_no = 0usize;

        loop {
            line.clear();
            let read = reader.read_until(b'\n', &mut line)?;
            if read == 0 {
                break;
            }
            line_no += 1;

            let record = trim_newline(&line);
            let query = query_field(record).ok_or_else(|| RecordError::Malformed {
                line_no,
                expected: 3,
                line: String::from_utf8_lossy(record).into_owned(),
            })?;

            if query != previous.as_slice() {
                index.insert(query, offset);
                previous.clear();
                previous.extend_from_slice(query);
            }
            offset += read as u64;
        }

        debug!(
            "Indexed {} queries from {} lines ({} bytes)",
            index.queries, line_no, offset
        );
        Ok(index)
    }

    /// Inserts `query` with the offset of its first record
    ///
    /// Returns false, leaving the index untouched, when every node on the
    /// path already exists. The empty query is never indexed.
    pub fn insert(&mut self, query: &[u8], offset: u64) -> bool {
        if query.is_empty() {
            return false;
        }

        let mut created = false;
        let mut node = &mut self.root;
        for (i, byte) in query.iter().enumerate() {
            node = node.children.entry(*byte).or_insert_with(|| {
                created = true;
                TrieNode::child(&query[..=i])
            });
        }

        if created {
            node.offset = Some(offset);
            self.queries += 1;
        }
        created
    }

    /// Looks up the node for exactly `query`
    pub fn find(&self, query: &[u8]) -> Option<&TrieNode> {
        query
            .iter()
            .try_fold(&self.root, |node, byte| node.children.get(byte))
    }

    /// Number of queries that created a node
    pub fn len(&self) -> usize {
        self.queries
    }

    pub fn is_empty(&self) -> bool {
        self.queries == 0
    }

    pub fn root(&self) -> &TrieNode {
        &self.root
    }

    /// Visits every leaf in level order (shallow leaves first, siblings in
    /// byte order), stopping at the first error
    pub fn try_walk_leaves<'a, E, F>(&'a self, mut visit: F) -> Result<(), E>
    where
        F: FnMut(&'a TrieNode) -> Result<(), E>,
    {
        let mut queue: VecDeque<&'a TrieNode> = self.root.children().collect();
        while let Some(node) = queue.pop_front() {
            if node.is_leaf() {
                visit(node)?;
            }
            queue.extend(node.children());
        }
        Ok(())
    }

    /// Collects the leaves in the order [`PrefixIndex::try_walk_leaves`]
    /// visits them
    pub fn leaves(&self) -> Vec<&TrieNode> {
        let mut leaves = Vec::new();
        let walked = self.try_walk_leaves::<Infallible, _>(|node| {
            leaves.push(node);
            Ok(())
        });
        match walked {
            Ok(()) => leaves,
            Err(never) => match never {},
        }
    }
}

fn trim_newline(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn labels(index: &PrefixIndex) -> Vec<String> {
        index
            .leaves()
            .iter()
            .map(|n| String::from_utf8_lossy(n.label()).into_owned())
            .collect()
    }

    #[test]
    fn test_leaves_are_most_specific_queries() {
        let data = "1\ta\tx\n1\tab\ty\n1\tac\tz\n";
        let index = PrefixIndex::build(Cursor::new(data)).unwrap();

        assert_eq!(labels(&index), vec!["ab", "ac"]);
        assert_eq!(index.find(b"a").unwrap().offset(), Some(0));
        assert_eq!(index.find(b"ab").unwrap().offset(), Some(6));
        assert_eq!(index.find(b"ac").unwrap().offset(), Some(13));
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_first_record_offset_wins() {
        let data = "5\tq\tone\n4\tq\ttwo\n3\tr\tx\n2\tq\tlate\n";
        let index = PrefixIndex::build(Cursor::new(data)).unwrap();

        assert_eq!(index.find(b"q").unwrap().offset(), Some(0));
        assert_eq!(index.find(b"r").unwrap().offset(), Some(16));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_prefix_after_longer_query_is_skipped() {
        let mut index = PrefixIndex::new();
        assert!(index.insert(b"abc", 0));
        assert!(!index.insert(b"ab", 10));

        let node = index.find(b"ab").unwrap();
        assert_eq!(node.offset(), None);
        assert_eq!(node.depth(), 2);
        assert_eq!(labels(&index), vec!["abc"]);
    }

    #[test]
    fn test_level_order_lists_shallow_leaves_first() {
        let mut index = PrefixIndex::new();
        for (i, query) in ["b", "a", "ax", "axe", "c"].iter().enumerate() {
            index.insert(query.as_bytes(), i as u64);
        }
        assert_eq!(labels(&index), vec!["b", "c", "axe"]);
    }

    #[test]
    fn test_leaves_follow_walk_order_and_walk_stops_on_error() {
        let mut index = PrefixIndex::new();
        for (i, query) in ["b", "a", "ax", "axe", "ay", "c"].iter().enumerate() {
            index.insert(query.as_bytes(), i as u64);
        }

        let mut visited = Vec::new();
        let walked = index.try_walk_leaves(|node| {
            visited.push(node.label().to_vec());
            if node.label() == b"ay" {
                return Err("stop");
            }
            Ok(())
        });
        assert_eq!(walked, Err("stop"));
        assert_eq!(visited, vec![b"b".to_vec(), b"c".to_vec(), b"ay".to_vec()]);
        assert_eq!(labels(&index), vec!["b", "c", "ay", "axe"]);
    }

    #[test]
    fn test_malformed_line_reports_line_number() {
        let data = "1\ta\tx\nbroken\n";
        match PrefixIndex::build(Cursor::new(data)) {
            Err(RecordError::Malformed { line_no, .. }) => assert_eq!(line_no, 2),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_empty_input_has_no_leaves() {
        let index = PrefixIndex::build(Cursor::new("")).unwrap();
        assert!(index.is_empty());
        assert!(index.leaves().is_empty());
    }
}
