use std::io;
use std::path::PathBuf;

use concord_types::ErrorClass;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl MergeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Io { source, .. } if source.kind() == io::ErrorKind::NotFound => {
                ErrorClass::Resource
            }
            Self::Io { .. } | Self::Serialization(_) => ErrorClass::Io,
        }
    }
}

pub type MergeResult<T> = Result<T, MergeError>;
