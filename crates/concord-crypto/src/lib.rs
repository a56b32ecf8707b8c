//! Content hashing for Concord.
//!
//! Every instance must derive bit-identical digests from the same input, so
//! there is exactly one algorithm (SHA-256), one input encoding (raw bytes,
//! or the UTF-8 bytes of hex digests for aggregates), and no domain tags.

pub mod hasher;

pub use hasher::{ContentHasher, HashError};
