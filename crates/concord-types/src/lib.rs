//! Foundation types for Concord.
//!
//! Concord keeps a tamper-evident, append-only event ledger that several
//! independent instances share, and a "hello" reconciliation protocol that
//! lets two instances compare their canonical state. Every other Concord
//! crate depends on `concord-types`.
//!
//! # Key Types
//!
//! - [`Digest`] -- Hex SHA-256 content digest
//! - [`LedgerEvent`] / [`Ledger`] -- The ledger document and its events
//! - [`ReceiptDigest`] / [`ReceiptDigestSet`] -- Content digests over evidence files
//! - [`HelloPacket`] -- Hash snapshot of one instance's canonical state
//! - [`ErrorClass`] -- Failure taxonomy shared by all crates

pub mod digest;
pub mod error;
pub mod event;
pub mod ledger;
pub mod packet;
pub mod receipt;
pub mod timestamp;

pub use digest::Digest;
pub use error::{ErrorClass, TypeError};
pub use event::{LedgerEvent, EVENT_KIND_DEFAULT, EVENT_KIND_GENESIS, EVENT_KIND_SYNC_ANCHOR};
pub use ledger::{Ledger, APPEND_ONLY_POLICY, LEDGER_VERSION};
pub use packet::HelloPacket;
pub use receipt::{ReceiptDigest, ReceiptDigestSet};
