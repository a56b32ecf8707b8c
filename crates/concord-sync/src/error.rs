use std::io;
use std::path::PathBuf;

use concord_crypto::HashError;
use concord_types::ErrorClass;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("missing receipts: {}", .0.join(", "))]
    MissingReceipts(Vec<String>),

    #[error("missing files: {}", .0.join(", "))]
    MissingFiles(Vec<String>),

    #[error("instance id must not be empty")]
    EmptyInstanceId,

    #[error("invalid hello packet {}: {reason}", path.display())]
    InvalidPacket { path: PathBuf, reason: String },

    #[error("hash error: {0}")]
    Hash(#[from] HashError),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl SyncError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::MissingReceipts(_) | Self::MissingFiles(_) => ErrorClass::Resource,
            Self::EmptyInstanceId => ErrorClass::Usage,
            Self::InvalidPacket { .. } => ErrorClass::Structural,
            Self::Hash(e) => e.class(),
            Self::Io { .. } | Self::Serialization(_) => ErrorClass::Io,
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
