//! Merge summaries for Concord.
//!
//! A merge does not combine ledgers. It records whether two instances hold
//! the same canonical state and produces the anchor note an operator appends
//! to the local ledger once they agree.

pub mod error;
pub mod summary;

pub use error::{MergeError, MergeResult};
pub use summary::{summarize, MergeSummary, PacketSide};
