use std::fmt;

use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid digest length: expected {expected} hex chars, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp { value: String, reason: String },
}

/// Failure taxonomy shared by every Concord crate.
///
/// Library errors map onto a class with a `class()` method; the CLI uses the
/// class to pick an exit code and a greppable tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Malformed JSON or missing required keys.
    Structural,
    /// Hash mismatch, truncation, prefix mutation, or non-monotonic time.
    Integrity,
    /// Declared files that do not exist.
    Resource,
    /// Unreadable files, permissions, failed writes.
    Io,
    /// Bad arguments or configuration.
    Usage,
}

impl ErrorClass {
    /// Process exit code for this class: `1` for validation failures, `2`
    /// for usage, IO, and structural problems.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Integrity | Self::Resource => 1,
            Self::Structural | Self::Io | Self::Usage => 2,
        }
    }

    /// Stable lowercase tag used in error lines.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Structural => "structural",
            Self::Integrity => "integrity",
            Self::Resource => "resource",
            Self::Io => "io",
            Self::Usage => "usage",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
