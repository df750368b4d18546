//! Errors returned by build operations.

use thiserror::Error;

use crate::domain::BuildState;
use crate::store::{CodecError, StoreError};

/// Errors that can occur while managing builds
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Build not found: {0}")]
    NotFound(String),

    #[error("Build {id} already completed with state {state}")]
    AlreadyCompleted { id: String, state: BuildState },

    #[error("Stored build {id} could not be decoded: {source}")]
    Decode {
        id: String,
        #[source]
        source: CodecError,
    },

    #[error("Store error: {0}")]
    Store(StoreError),
}

/// Coarse classification of a [`BuildError`] for callers and transports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Server-side fault
    Internal,

    /// The referenced build does not exist
    NotFound,

    /// The build is not in a state that allows the operation
    FailedPrecondition,

    /// Stored data is unreadable
    DataLoss,

    /// The store is temporarily busy
    Unavailable,
}

impl BuildError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Internal(_) => ErrorKind::Internal,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AlreadyCompleted { .. } => ErrorKind::FailedPrecondition,
            Self::Decode { .. } => ErrorKind::DataLoss,
            Self::Store(err) if err.is_busy() => ErrorKind::Unavailable,
            Self::Store(_) => ErrorKind::Internal,
        }
    }

    /// Whether retrying the same call could succeed
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Unavailable
    }
}

impl From<StoreError> for BuildError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { key, .. } => Self::NotFound(key),
            StoreError::Decode { key, source, .. } => Self::Decode { id: key, source },
            other => Self::Store(other),
        }
    }
}
