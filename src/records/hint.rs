use crate::{RecordError, RecordResult};
use std::fmt;
use std::io::BufRead;

/// One suggestion returned by the hint endpoint for `query`
///
/// Persisted as `priority<TAB>query<TAB>term`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hint {
    /// Relevance reported by the endpoint
    pub priority: i16,

    /// The query that produced this suggestion
    pub query: String,

    /// The suggested phrase
    pub term: String,
}

impl Hint {
    pub fn new(priority: i16, query: impl Into<String>, term: impl Into<String>) -> Self {
        Self {
            priority,
            query: query.into(),
            term: term.into(),
        }
    }

    /// Parses one record line (without its trailing newline)
    ///
    /// The term is everything after the second tab, so a tab inside a term
    /// survives, while a tab inside a query does not.
    pub fn parse_line(line: &str, line_no: usize) -> RecordResult<Self> {
        let mut fields = line.splitn(3, '\t');
        let (Some(priority), Some(query), Some(term)) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(RecordError::Malformed {
                line_no,
                expected: 3,
                line: line.to_string(),
            });
        };

        let priority = priority
            .parse::<i16>()
            .map_err(|_| RecordError::BadPriority {
                line_no,
                value: priority.to_string(),
                line: line.to_string(),
            })?;

        Ok(Self::new(priority, query, term))
    }
}

impl fmt::Display for Hint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.priority, self.query, self.term)
    }
}

/// Reads every hint record from `reader`, failing on the first malformed line
pub fn read_hints<R: BufRead>(reader: R) -> RecordResult<Vec<Hint>> {
    let mut hints = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        hints.push(Hint::parse_line(&line, idx + 1)?);
    }
    Ok(hints)
}

/// Serializes a batch of hints as newline-terminated record lines
///
/// One crawl task's batch is written in a single call so its lines stay together.
pub fn encode_hints(hints: &[Hint]) -> Vec<u8> {
    let mut buf = String::new();
    for hint in hints {
        buf.push_str(&hint.to_string());
        buf.push('\n');
    }
    buf.into_bytes()
}

/// Extracts the raw query field from a record line without decoding the rest
pub fn query_field(line: &[u8]) -> Option<&[u8]> {
    let mut fields = line.splitn(3, |b| *b == b'\t');
    fields.next()?;
    let query = fields.next()?;
    fields.next()?;
    Some(query)
}
