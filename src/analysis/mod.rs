//! Batch analysis over persisted records
//!
//! Hint records are loaded whole and sorted by `(term, query)` before `uniq`
//! and `leaf` scan them; snapshot records are sorted by `(term, bundleId)`
//! before two snapshots are merged into a positional diff.

mod diff;
mod hints;

pub use diff::{diff, diff_snapshots, sort_snapshot, ChangeKind, Difference};
pub use hints::{leaf, sort_hints, terms, uniq};
