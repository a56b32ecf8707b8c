//! Comparison engine for Concord.
//!
//! Compares two hello packets into an ordered list of human-readable
//! divergences, and renders line deltas between ledger events for guard
//! diagnostics.
//!
//! # Key Types
//!
//! - [`Divergence`] -- One difference between two packets
//! - [`EventDelta`] / [`DeltaLine`] -- Line-level diff of two ledger events

pub mod event_diff;
pub mod packet_diff;

pub use event_diff::{diff_events, DeltaLine, EventDelta};
pub use packet_diff::{compare, diff_packets, Divergence};
