//! Append-only event ledger for Concord.
//!
//! This crate owns the only shared mutable resource in the system, the
//! ledger file. It provides:
//! - Parsing and canonical serialization of the ledger document
//! - Idempotent seeding and atomic single-event append
//! - The append-only guard, a pure check over a committed snapshot and a
//!   working copy
//! - [`PriorRevisionProvider`] implementations that supply the committed
//!   snapshot (git, snapshot file, none)

pub mod error;
pub mod guard;
pub mod prior;
pub mod store;

pub use error::{LedgerError, LedgerResult};
pub use guard::{
    verify, verify_with, GuardError, GuardOutcome, GuardPolicy, PolicyWarning, Snapshot,
};
pub use prior::{
    GitPriorRevision, InMemoryPrior, NoPrior, PriorRevisionProvider, SnapshotFile,
};
pub use store::{load, parse, serialize, LedgerStore, SeedOutcome};
