use std::cmp::Ordering;
use std::fmt;

use crate::records::SearchRecord;

/// Kind of change a [`Difference`] describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Present only in the second snapshot
    New,

    /// Present only in the first snapshot
    Die,

    /// Present in both; the delta is the rank shift
    Alive,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Die => "die",
            Self::Alive => "alive",
        }
    }
}

/// One entry of a snapshot comparison
///
/// For a surviving app `delta` is `position2 - position1` (negative means it
/// moved up). For an appearance it is `+position2`, for a disappearance
/// `-position1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Difference {
    pub delta: i32,
    pub bundle_id: String,
    pub term: String,
    pub edge: bool,
}

impl Difference {
    fn appeared(record: &SearchRecord) -> Self {
        Self {
            delta: i32::from(record.position),
            bundle_id: record.bundle_id.clone(),
            term: record.term.clone(),
            edge: true,
        }
    }

    fn disappeared(record: &SearchRecord) -> Self {
        Self {
            delta: -i32::from(record.position),
            bundle_id: record.bundle_id.clone(),
            term: record.term.clone(),
            edge: true,
        }
    }

    fn moved(before: &SearchRecord, after: &SearchRecord) -> Self {
        Self {
            delta: i32::from(after.position) - i32::from(before.position),
            bundle_id: after.bundle_id.clone(),
            term: after.term.clone(),
            edge: false,
        }
    }

    pub fn kind(&self) -> ChangeKind {
        match (self.edge, self.delta > 0) {
            (false, _) => ChangeKind::Alive,
            (true, true) => ChangeKind::New,
            (true, false) => ChangeKind::Die,
        }
    }
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.delta,
            self.kind().as_str(),
            self.bundle_id,
            self.term
        )
    }
}

/// Sorts a snapshot by `(term, bundleId)`
pub fn sort_snapshot(records: &mut [SearchRecord]) {
    records.sort_by(SearchRecord::key_cmp);
}

/// Merges two `(term, bundleId)`-sorted snapshots in one linear pass
pub fn diff(before: &[SearchRecord], after: &[SearchRecord]) -> Vec<Difference> {
    let mut out = Vec::with_capacity(before.len().max(after.len()));
    let (mut i, mut j) = (0, 0);

    loop {
        let difference = match (before.get(i), after.get(j)) {
            (Some(old), Some(new)) => match old.key_cmp(new) {
                Ordering::Less => {
                    i += 1;
                    Difference::disappeared(old)
                }
                Ordering::Greater => {
                    j += 1;
                    Difference::appeared(new)
                }
                Ordering::Equal => {
                    i += 1;
                    j += 1;
                    Difference::moved(old, new)
                }
            },
            (Some(old), None) => {
                i += 1;
                Difference::disappeared(old)
            }
            (None, Some(new)) => {
                j += 1;
                Difference::appeared(new)
            }
            (None, None) => break,
        };
        out.push(difference);
    }

    out
}

/// Sorts both snapshots, then diffs them
pub fn diff_snapshots(
    mut before: Vec<SearchRecord>,
    mut after: Vec<SearchRecord>,
) -> Vec<Difference> {
    sort_snapshot(&mut before);
    sort_snapshot(&mut after);
    diff(&before, &after)
}
