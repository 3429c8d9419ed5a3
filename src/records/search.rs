use crate::{RecordError, RecordResult};
use std::cmp::Ordering;
use std::fmt;
use std::io::BufRead;

/// One ranked app in the search results for `term`
///
/// Persisted as `position<TAB>bundleId<TAB>term`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRecord {
    /// 1-based rank of `bundle_id` within the results for `term`
    pub position: u8,

    /// Unique identifier of the application
    pub bundle_id: String,

    /// The searched term
    pub term: String,
}

impl SearchRecord {
    pub fn new(position: u8, bundle_id: impl Into<String>, term: impl Into<String>) -> Self {
        Self {
            position,
            bundle_id: bundle_id.into(),
            term: term.into(),
        }
    }

    /// Builds the ranked records for one search response
    ///
    /// Positions past 255 do not fit the record format and are dropped.
    pub fn from_ranking(term: &str, bundle_ids: &[String]) -> Vec<Self> {
        bundle_ids
            .iter()
            .zip(1..=u8::MAX)
            .map(|(bundle_id, position)| Self::new(position, bundle_id.as_str(), term))
            .collect()
    }

    /// Parses one snapshot line (without its trailing newline)
    pub fn parse_line(line: &str, line_no: usize) -> RecordResult<Self> {
        let mut fields = line.splitn(3, '\t');
        let (Some(position), Some(bundle_id), Some(term)) =
            (fields.next(), fields.next(), fields.next())
        else {
            return Err(RecordError::Malformed {
                line_no,
                expected: 3,
                line: line.to_string(),
            });
        };

        let position = match position.parse::<u8>() {
            Ok(p) if p > 0 => p,
            _ => {
                return Err(RecordError::BadPosition {
                    line_no,
                    value: position.to_string(),
                    line: line.to_string(),
                })
            }
        };

        Ok(Self::new(position, bundle_id, term))
    }

    /// Snapshot ordering used by the diff: `(term, bundle_id)`
    pub fn key_cmp(&self, other: &Self) -> Ordering {
        self.term
            .cmp(&other.term)
            .then_with(|| self.bundle_id.cmp(&other.bundle_id))
    }
}

impl fmt::Display for SearchRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.position, self.bundle_id, self.term)
    }
}

/// Reads every snapshot record from `reader`, failing on the first malformed line
pub fn read_search_records<R: BufRead>(reader: R) -> RecordResult<Vec<SearchRecord>> {
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        records.push(SearchRecord::parse_line(&line, idx + 1)?);
    }
    Ok(records)
}

/// Serializes a batch of snapshot records as newline-terminated lines
pub fn encode_search_records(records: &[SearchRecord]) -> Vec<u8> {
    let mut buf = String::new();
    for record in records {
        buf.push_str(&record.to_string());
        buf.push('\n');
    }
    buf.into_bytes()
}
