//! Errors raised by the record store.

use rusqlite::ErrorCode;
use thiserror::Error;

use super::codec::CodecError;

/// Errors that can occur while reading or writing records
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found: {partition}/{key}")]
    NotFound { partition: String, key: String },

    #[error("Failed to decode record {partition}/{key}: {source}")]
    Decode {
        partition: String,
        key: String,
        #[source]
        source: CodecError,
    },

    #[error("Failed to encode record {partition}/{key}: {source}")]
    Encode {
        partition: String,
        key: String,
        #[source]
        source: CodecError,
    },

    #[error("Partition not registered: {0}")]
    MissingPartition(String),

    #[error("Invalid partition name {name:?}: {reason}")]
    InvalidPartition { name: String, reason: &'static str },

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store connection lock poisoned")]
    Poisoned,
}

impl StoreError {
    /// True when the engine refused the operation because another writer
    /// held the database. These are the only failures worth retrying.
    pub fn is_busy(&self) -> bool {
        match self {
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}
