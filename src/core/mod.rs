//! Build lifecycle logic.
//!
//! This module contains:
//! - BuildService: create/complete/list over the record store
//! - BuildApi: the transport-agnostic remote operations
//! - IdGenerator/Clock: collaborators the service depends on

pub mod api;
pub mod builds;
pub mod clock;
pub mod error;
pub mod ids;

// Re-export commonly used types
pub use api::{
    BuildApi, CompleteBuildRequest, CreateBuildRequest, CreateBuildResponse, GetBuildRequest,
    ListBuildsResponse,
};
pub use builds::{BuildListing, BuildService, RecordFailure, BUILD_PARTITION};
pub use clock::{Clock, SystemClock};
pub use error::{BuildError, ErrorKind};
pub use ids::{IdError, IdGenerator, UuidGenerator};

/// Partitions every entity kind in this crate needs.
///
/// Pass these to [`StoreConfig::with_partitions`](crate::store::StoreConfig::with_partitions)
/// before opening the store.
pub fn required_partitions() -> Vec<&'static str> {
    vec![BUILD_PARTITION]
}
