//! Expansion policy: from one response to a progress mark and follow-up queries
//!
//! - `mark` condenses a response into a [`ProgressMark`]
//! - `should_expand` compares a mark against the crawl threshold
//! - `generate_children` extends a query by every alphabet symbol

mod mark;
mod policy;

pub use mark::ProgressMark;
pub use policy::{generate_children, mark, should_expand, ExpansionPolicy};

use thiserror::Error;

/// Maximum number of results the hint endpoint returns for one query
pub const PAGE_SIZE: usize = 50;

/// A response violated an assumption about the remote API
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("result count {0} exceeds the page size of {PAGE_SIZE}")]
    ResultCountExceeded(usize),

    #[error("priority order violated at item {index}: {current} follows {previous}")]
    PriorityOrderViolation {
        index: usize,
        previous: i16,
        current: i16,
    },

    #[error("negative top priority {0} on a saturated page")]
    NegativePriority(i16),
}
