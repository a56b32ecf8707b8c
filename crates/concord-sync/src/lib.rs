//! Hello protocol for Concord.
//!
//! Two instances reconcile by exchanging [`HelloPacket`]s: hash snapshots of
//! their policy document, their ledger, and their declared receipts. This
//! crate builds those snapshots from local files and gathers receipts a peer
//! references. Comparing packets lives in `concord-diff`.
//!
//! [`HelloPacket`]: concord_types::HelloPacket

pub mod error;
pub mod fetch;
pub mod hello;
pub mod receipts;

pub use error::{SyncError, SyncResult};
pub use fetch::{fetch_receipts, FetchReport};
pub use hello::{build_packet, encode_packet, read_packet, write_packet, HelloRequest};
pub use receipts::build_digest_set;
