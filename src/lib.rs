//! buildledger - Transactional build lifecycle tracking
//!
//! Records build attempts (creation, completion, enumeration) in an embedded
//! transactional store.
//!
//! # Architecture
//!
//! The system is built around a generic record store:
//! - Any serde type can be stored as bytes under a key in a named partition
//! - Every operation runs in a single transaction; failures roll back
//! - Builds are one entity kind layered on top of that store
//!
//! # Modules
//!
//! - `store`: Transactional record store (codec, partitions, transactions)
//! - `core`: Build lifecycle service and its remote API
//! - `domain`: Data structures (Build, Status, Artifact)
//! - `config`: Configuration resolution
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Start a build
//! buildledger create svc-a
//!
//! # Record its outcome
//! buildledger complete <build-id> --artifact bin-xyz
//!
//! # List builds
//! buildledger list
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod store;

// Re-export main types at crate root for convenience
pub use core::{BuildApi, BuildError, BuildListing, BuildService};
pub use domain::{Artifact, Build, BuildFailure, BuildResult, BuildState, Component};
pub use store::{Store, StoreConfig, StoreError};
