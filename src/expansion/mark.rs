use std::fmt;

/// Outcome of processing one crawl task, stored in the progress index
///
/// On disk every mark is a single little-endian `i16`. Positive values are real
/// priorities, the small negative range carries result counts, and a handful of
/// reserved values act as sentinels. Zero is never produced, so an all-zero slot
/// reads as "not settled yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgressMark {
    /// The query returned nothing; never expanded, never revisited
    NoResults,

    /// Fewer results than a page holds, so the result set is complete (1..=49)
    Complete(u8),

    /// A full page whose top priority is the carried (positive) value
    Saturated(i16),

    /// A full page whose top priority is exactly zero
    SaturatedZero,

    /// The response broke a data-integrity assumption; settled permanently
    Rejected,
}

impl ProgressMark {
    /// Raw value of [`ProgressMark::NoResults`]
    pub const NO_RESULTS: i16 = i16::MIN;

    /// Raw value of [`ProgressMark::Rejected`]
    pub const REJECTED: i16 = -50;

    /// Raw value of [`ProgressMark::SaturatedZero`]
    pub const SATURATED_ZERO: i16 = -51;

    /// Compact encoding used by the progress index
    pub fn encode(self) -> i16 {
        match self {
            Self::NoResults => Self::NO_RESULTS,
            Self::Complete(count) => -i16::from(count),
            Self::Saturated(priority) => priority,
            Self::SaturatedZero => Self::SATURATED_ZERO,
            Self::Rejected => Self::REJECTED,
        }
    }

    /// Decodes a progress slot
    ///
    /// Returns `None` for an unset slot (zero) and for values outside the
    /// encoding, which are then treated as not settled and retried.
    pub fn decode(raw: i16) -> Option<Self> {
        match raw {
            0 => None,
            Self::NO_RESULTS => Some(Self::NoResults),
            Self::REJECTED => Some(Self::Rejected),
            Self::SATURATED_ZERO => Some(Self::SaturatedZero),
            -49..=-1 => Some(Self::Complete(raw.unsigned_abs() as u8)),
            p if p > 0 => Some(Self::Saturated(p)),
            _ => None,
        }
    }

    /// Short lowercase name of the variant, used in statistics output
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoResults => "no-results",
            Self::Complete(_) => "complete",
            Self::Saturated(_) => "saturated",
            Self::SaturatedZero => "saturated-zero",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ProgressMark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete(count) => write!(f, "complete({})", count),
            Self::Saturated(priority) => write!(f, "saturated({})", priority),
            other => f.write_str(other.kind()),
        }
    }
}
