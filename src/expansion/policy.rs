use crate::config::CrawlerConfig;
use crate::expansion::{IntegrityError, ProgressMark, PAGE_SIZE};
use crate::records::Hint;

/// Summarises one response as a progress mark
///
/// # Rules
///
/// | Results | Mark |
/// |---------|------|
/// | 0 | `NoResults` |
/// | 1..=49 | `Complete(count)` |
/// | 50, top priority > 0 | `Saturated(top)` |
/// | 50, top priority == 0 | `SaturatedZero` |
/// | > 50 | `ResultCountExceeded` |
///
/// Priorities must be non-increasing across the response; the first item
/// carries the top priority.
pub fn mark(hints: &[Hint]) -> Result<ProgressMark, IntegrityError> {
    let count = hints.len();
    if count == 0 {
        return Ok(ProgressMark::NoResults);
    }
    if count > PAGE_SIZE {
        return Err(IntegrityError::ResultCountExceeded(count));
    }

    if let Some((index, pair)) = hints
        .windows(2)
        .enumerate()
        .find(|(_, pair)| pair[1].priority > pair[0].priority)
    {
        return Err(IntegrityError::PriorityOrderViolation {
            index: index + 1,
            previous: pair[0].priority,
            current: pair[1].priority,
        });
    }

    if count < PAGE_SIZE {
        return Ok(ProgressMark::Complete(count as u8));
    }

    match hints[0].priority {
        0 => Ok(ProgressMark::SaturatedZero),
        top if top < 0 => Err(IntegrityError::NegativePriority(top)),
        top => Ok(ProgressMark::Saturated(top)),
    }
}

/// Decides whether a query with `mark` should be drilled into
///
/// A threshold of zero means "expand whenever there might be more", which
/// includes a saturated page whose top priority is zero even though its
/// sentinel is negative.
pub fn should_expand(mark: ProgressMark, threshold: i16) -> bool {
    match mark {
        ProgressMark::NoResults | ProgressMark::Rejected => false,
        ProgressMark::SaturatedZero if threshold == 0 => true,
        other => other.encode() >= threshold,
    }
}

/// Produces the follow-up queries of `query`, in alphabet order
///
/// One child per alphabet symbol, plus `query + " "` when the query is
/// non-empty and does not already end in a space.
pub fn generate_children(query: &str, alphabet: &str) -> Vec<String> {
    let mut children = Vec::with_capacity(alphabet.len() + 1);
    for symbol in alphabet.chars() {
        let mut child = String::with_capacity(query.len() + 1);
        child.push_str(query);
        child.push(symbol);
        children.push(child);
    }

    if !query.is_empty() && !query.ends_with(' ') {
        children.push(format!("{} ", query));
    }
    children
}

/// Expansion settings of one crawl: threshold plus alphabet
#[derive(Debug, Clone)]
pub struct ExpansionPolicy {
    threshold: i16,
    alphabet: String,
}

impl ExpansionPolicy {
    pub fn new(threshold: i16, alphabet: impl Into<String>) -> Self {
        Self {
            threshold,
            alphabet: alphabet.into(),
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(config.min_priority, config.alphabet.clone())
    }

    pub fn threshold(&self) -> i16 {
        self.threshold
    }

    pub fn mark(&self, hints: &[Hint]) -> Result<ProgressMark, IntegrityError> {
        mark(hints)
    }

    pub fn should_expand(&self, mark: ProgressMark) -> bool {
        should_expand(mark, self.threshold)
    }

    pub fn generate_children(&self, query: &str) -> Vec<String> {
        generate_children(query, &self.alphabet)
    }

    /// The crawl's starting frontier: the children of the empty query
    pub fn seeds(&self) -> Vec<String> {
        self.generate_children("")
    }

    /// Children to enqueue after a task settled with `mark`
    pub fn follow_ups(&self, query: &str, mark: ProgressMark) -> Vec<String> {
        if self.should_expand(mark) {
            self.generate_children(query)
        } else {
            Vec::new()
        }
    }
}
