//! Partition names and store configuration.
//!
//! Every entity kind keeps its records in its own partition. The full list of
//! partitions is handed to [`Store::open`](super::Store::open) through a
//! [`StoreConfig`]; the store creates them all before the first transaction
//! and never adds or removes any afterwards.

use std::borrow::Borrow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::error::StoreError;

/// Default time the engine waits on a locked database before failing
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Default number of read-only connections
pub const DEFAULT_READ_CONNECTIONS: usize = 4;

const MAX_PARTITION_NAME_LEN: usize = 64;

/// A validated partition name
///
/// Names match `[a-z][a-z0-9_]*` so they can be used as part of a table name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionName(String);

impl PartitionName {
    pub fn new(name: &str) -> Result<Self, StoreError> {
        let invalid = |reason| StoreError::InvalidPartition {
            name: name.to_string(),
            reason,
        };

        let mut chars = name.chars();
        match chars.next() {
            None => return Err(invalid("name is empty")),
            Some(c) if !c.is_ascii_lowercase() => {
                return Err(invalid("name must start with a lowercase letter"))
            }
            Some(_) => {}
        }

        if name.len() > MAX_PARTITION_NAME_LEN {
            return Err(invalid("name is longer than 64 characters"));
        }

        if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
            return Err(invalid(
                "name may only contain lowercase letters, digits and underscores",
            ));
        }

        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Backing table for this partition
    pub(crate) fn table(&self) -> String {
        format!("bucket_{}", self.0)
    }
}

impl Borrow<str> for PartitionName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartitionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Settings for opening a [`Store`](super::Store)
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Database file
    pub path: PathBuf,

    /// How long the engine waits on a locked database
    pub busy_timeout: Duration,

    /// Size of the read-only connection pool (at least one is always opened)
    pub read_connections: usize,

    partitions: Vec<String>,
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            read_connections: DEFAULT_READ_CONNECTIONS,
            partitions: Vec::new(),
        }
    }

    /// Register a partition that must exist once the store is open
    pub fn with_partition(mut self, name: impl Into<String>) -> Self {
        self.partitions.push(name.into());
        self
    }

    /// Register several partitions at once
    pub fn with_partitions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.partitions.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn with_read_connections(mut self, count: usize) -> Self {
        self.read_connections = count;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Partition names as registered (unvalidated, possibly duplicated)
    pub fn partitions(&self) -> &[String] {
        &self.partitions
    }
}
