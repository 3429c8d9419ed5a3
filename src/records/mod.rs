//! Record formats persisted by the crawlers
//!
//! Both formats are tab-separated and newline-terminated, with no escaping:
//! - hints: `priority<TAB>query<TAB>term`
//! - search snapshots: `position<TAB>bundleId<TAB>term`

mod hint;
mod search;

pub use hint::{encode_hints, query_field, read_hints, Hint};
pub use search::{encode_search_records, read_search_records, SearchRecord};
