use std::io;
use std::path::PathBuf;

use concord_types::ErrorClass;

/// Errors produced by ledger storage operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("invalid JSON in {origin}: {reason}")]
    InvalidJson { origin: String, reason: String },

    #[error("invalid ledger schema in {origin}: {reason}")]
    InvalidSchema { origin: String, reason: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("clock is behind the ledger tip: last event at {last}, now {now}")]
    ClockBehind { last: String, now: String },

    #[error("event note must not be empty")]
    EmptyNote,

    #[error("cannot read prior revision: {0}")]
    PriorRevision(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl LedgerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidJson { .. } | Self::InvalidSchema { .. } => ErrorClass::Structural,
            Self::Io { source, .. } if source.kind() == io::ErrorKind::NotFound => {
                ErrorClass::Resource
            }
            Self::Io { .. } | Self::PriorRevision(_) | Self::Serialization(_) => ErrorClass::Io,
            Self::ClockBehind { .. } => ErrorClass::Integrity,
            Self::EmptyNote => ErrorClass::Usage,
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
