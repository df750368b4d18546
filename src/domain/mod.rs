//! Domain types for the build ledger.
//!
//! This module contains the persisted records:
//! - Build: one build attempt and its outcome
//! - Component/Artifact/BuildFailure: the values a build carries

pub mod build;

// Re-export commonly used types
pub use build::{
    Artifact, Build, BuildFailure, BuildResult, BuildState, Component, ComponentKind, Status,
};
