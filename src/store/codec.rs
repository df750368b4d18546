//! Record serialization.
//!
//! Records are stored as JSON bytes. The shape of each record is described by
//! its serde derives, so any `Serialize + DeserializeOwned` type can be kept
//! in a partition.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Errors converting between records and stored bytes
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("serialization failed: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("malformed or incompatible record: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("stored value has unexpected type {0}")]
    UnexpectedType(&'static str),
}

/// Encode a record into bytes suitable for storage
pub fn encode<T: Serialize>(record: &T) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(record).map_err(CodecError::Encode)
}

/// Decode a record from stored bytes
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    serde_json::from_slice(bytes).map_err(CodecError::Decode)
}
