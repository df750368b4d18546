//! Identifier generation for new records.

use thiserror::Error;
use uuid::Uuid;

/// Failure to produce an identifier
#[derive(Debug, Error)]
#[error("{0}")]
pub struct IdError(pub String);

/// Source of collision-resistant unique identifiers
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> Result<String, IdError>;
}

/// Random (v4) UUIDs in their 32-character simple form
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> Result<String, IdError> {
        Ok(Uuid::new_v4().simple().to_string())
    }
}
