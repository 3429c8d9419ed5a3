//! Prefix index over a crawl's results file
//!
//! The crawl appends results in breadth-first order, so the first record of
//! every query also marks where that query's block starts. The index keeps
//! one trie node per query byte-path, remembering the block's byte offset.
//! Walking the trie's leaves yields the most specific queries, whose result
//! blocks can then be streamed straight from the file.

mod trie;
mod walker;

pub use trie::{PrefixIndex, TrieNode};
pub use walker::LeafWalker;
