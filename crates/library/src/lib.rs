//! Operations on the persisted show collection: merging scan batches in and
//! summarising what is there.

pub mod merge;
pub mod stats;

pub use merge::{MergeSummary, merge_shows};
pub use stats::{CollectionTotals, categorize};
