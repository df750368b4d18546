//! Build records and their lifecycle state.
//!
//! A Build is one attempt at producing an artifact for a component. It starts
//! out running and is finalized exactly once, either with an artifact or with
//! a failure.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted build attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    /// Unique identifier, assigned at creation
    pub id: String,

    /// Lifecycle status
    pub status: Status,

    /// Component this build belongs to (stored as given)
    pub component: Component,

    /// Produced artifact (only set once the build succeeded)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Artifact>,
}

impl Build {
    /// Create a new running build
    pub fn new(id: String, component: Component, start_time: DateTime<Utc>) -> Self {
        Self {
            id,
            status: Status::running(start_time),
            component,
            artifact: None,
        }
    }

    /// Finalize the build with the given outcome.
    ///
    /// Does not check the current state; callers that care about double
    /// completion must check [`Build::is_finished`] first.
    pub fn complete(&mut self, result: BuildResult, complete_time: DateTime<Utc>) {
        self.status.complete_time = Some(complete_time);

        match result {
            BuildResult::Artifact(artifact) => {
                self.status.state = BuildState::Success;
                self.status.error = None;
                self.artifact = Some(artifact);
            }
            BuildResult::Error(failure) => {
                self.status.state = BuildState::Error;
                self.status.error = Some(failure);
                self.artifact = None;
            }
        }
    }

    /// Check if the build is still in progress
    pub fn is_running(&self) -> bool {
        self.status.state == BuildState::Running
    }

    /// Check if the build has completed (successfully or not)
    pub fn is_finished(&self) -> bool {
        !self.is_running()
    }

    /// Verify that the outcome fields agree with the state.
    pub fn check_consistency(&self) -> Result<(), String> {
        let has_artifact = self.artifact.is_some();
        let has_error = self.status.error.is_some();
        let has_complete_time = self.status.complete_time.is_some();

        match self.status.state {
            BuildState::Running if has_artifact || has_error || has_complete_time => Err(format!(
                "build {} is running but already carries an outcome",
                self.id
            )),
            BuildState::Success if !has_artifact || has_error => Err(format!(
                "build {} succeeded without exactly one artifact",
                self.id
            )),
            BuildState::Error if has_artifact || !has_error => Err(format!(
                "build {} failed without exactly one error",
                self.id
            )),
            BuildState::Success | BuildState::Error if !has_complete_time => Err(format!(
                "build {} is finished but has no completion time",
                self.id
            )),
            _ => Ok(()),
        }
    }
}

/// Lifecycle status of a build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// Current state
    pub state: BuildState,

    /// When the build started
    pub start_time: DateTime<Utc>,

    /// When the build completed (if applicable)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complete_time: Option<DateTime<Utc>>,

    /// Failure details (only set in the error state)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<BuildFailure>,
}

impl Status {
    fn running(start_time: DateTime<Utc>) -> Self {
        Self {
            state: BuildState::Running,
            start_time,
            complete_time: None,
            error: None,
        }
    }
}

/// State of a build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildState {
    /// Currently executing
    #[default]
    Running,

    /// Completed with an artifact
    Success,

    /// Completed with an error
    Error,
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Running => "running",
            Self::Success => "success",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Reference to the component that owns a build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// What kind of component this is
    #[serde(default)]
    pub kind: ComponentKind,

    /// Component name
    pub name: String,
}

impl Component {
    pub fn new(kind: ComponentKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    /// A builder component (the common case for builds)
    pub fn builder(name: impl Into<String>) -> Self {
        Self::new(ComponentKind::Builder, name)
    }
}

impl From<&str> for Component {
    fn from(name: &str) -> Self {
        Self::new(ComponentKind::Unknown, name)
    }
}

/// Kinds of components a build can reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    #[default]
    Unknown,
    Builder,
    Registry,
    Platform,
}

/// Opaque payload produced by a successful build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Artifact content or reference
    pub content: String,

    /// Free-form labels attached by the builder
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl Artifact {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            labels: BTreeMap::new(),
        }
    }

    /// Attach a label
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

/// Failure details for a build that ended in error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildFailure {
    /// Status code reported by the builder
    pub code: i32,

    /// Human-readable message
    pub message: String,
}

impl BuildFailure {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Outcome of a build: exactly one of artifact or error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildResult {
    Artifact(Artifact),
    Error(BuildFailure),
}
