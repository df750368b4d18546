//! Build lifecycle: create, complete, list.
//!
//! Every operation is a single store transaction run on the blocking pool.
//! A failure anywhere inside the transaction rolls it back, so callers never
//! observe a half-applied change.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::domain::{Build, BuildResult, BuildState, Component};
use crate::store::{Store, StoreError};

use super::clock::{Clock, SystemClock};
use super::error::BuildError;
use super::ids::{IdGenerator, UuidGenerator};

/// Partition holding build records, keyed by build id
pub const BUILD_PARTITION: &str = "build";

/// A stored record that could not be read back
#[derive(Debug)]
pub struct RecordFailure {
    /// Key of the unreadable record
    pub id: String,

    /// Why it could not be decoded
    pub error: StoreError,
}

/// Result of listing builds
#[derive(Debug, Default)]
pub struct BuildListing {
    /// Builds in store key order
    pub builds: Vec<Build>,

    /// Records that were skipped because they failed to decode
    pub failures: Vec<RecordFailure>,
}

/// Manages the build lifecycle on top of a [`Store`]
#[derive(Clone)]
pub struct BuildService {
    store: Store,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl BuildService {
    /// Create a service using random ids and the system clock
    pub fn new(store: Store) -> Self {
        Self::with_collaborators(store, Arc::new(UuidGenerator), Arc::new(SystemClock))
    }

    pub fn with_collaborators(
        store: Store,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { store, ids, clock }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Record a new running build for `component` and return its id
    #[instrument(skip(self, component), fields(component = %component.name))]
    pub async fn create(&self, component: Component) -> Result<String, BuildError> {
        let service = self.clone();
        run_blocking(move || service.create_blocking(component)).await
    }

    /// Finalize a build with an artifact or an error
    #[instrument(skip(self, id, result), fields(build_id = %id))]
    pub async fn complete(&self, id: &str, result: BuildResult) -> Result<(), BuildError> {
        let service = self.clone();
        let id = id.to_string();
        run_blocking(move || service.complete_blocking(&id, result)).await
    }

    /// List every stored build
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<BuildListing, BuildError> {
        let service = self.clone();
        run_blocking(move || service.list_blocking()).await
    }

    /// Fetch a single build
    #[instrument(skip(self, id), fields(build_id = %id))]
    pub async fn get(&self, id: &str) -> Result<Build, BuildError> {
        let service = self.clone();
        let id = id.to_string();
        run_blocking(move || service.get_blocking(&id)).await
    }

    fn create_blocking(&self, component: Component) -> Result<String, BuildError> {
        let id = self
            .ids
            .generate()
            .map_err(|e| BuildError::Internal(format!("id generation failed: {}", e)))?;
        if id.is_empty() {
            return Err(BuildError::Internal(
                "id generator returned an empty id".to_string(),
            ));
        }

        let build = Build::new(id, component, self.clock.now());

        self.store.update(|tx| {
            let bucket = tx.bucket(BUILD_PARTITION)?;
            if bucket.contains(&build.id)? {
                return Err(BuildError::Internal(format!(
                    "id generator returned an existing id: {}",
                    build.id
                )));
            }
            bucket.put(&build.id, &build)?;
            Ok::<(), BuildError>(())
        })?;

        info!(build_id = %build.id, "Build created");
        Ok(build.id)
    }

    fn complete_blocking(&self, id: &str, result: BuildResult) -> Result<(), BuildError> {
        let state = self.store.update(|tx| {
            let bucket = tx.bucket(BUILD_PARTITION)?;
            let mut build: Build = bucket.get(id)?;

            if build.is_finished() {
                return Err(BuildError::AlreadyCompleted {
                    id: id.to_string(),
                    state: build.status.state,
                });
            }

            // Never stamp a completion earlier than the start, even if the
            // clock stepped backwards in between.
            let complete_time = self.clock.now().max(build.status.start_time);
            build.complete(result, complete_time);

            bucket.put(&build.id, &build)?;
            Ok::<BuildState, BuildError>(build.status.state)
        })?;

        info!(%state, "Build completed");
        Ok(())
    }

    fn list_blocking(&self) -> Result<BuildListing, BuildError> {
        self.store.view(|tx| {
            let mut listing = BuildListing::default();

            tx.bucket(BUILD_PARTITION)?
                .for_each(|key, record: Result<Build, StoreError>| {
                    match record {
                        Ok(build) => listing.builds.push(build),
                        Err(error) => {
                            warn!(build_id = %key, %error, "Skipping unreadable build record");
                            listing.failures.push(RecordFailure {
                                id: key.to_string(),
                                error,
                            });
                        }
                    }
                    Ok::<(), BuildError>(())
                })?;

            Ok(listing)
        })
    }

    fn get_blocking(&self, id: &str) -> Result<Build, BuildError> {
        self.store.view(|tx| Ok(tx.bucket(BUILD_PARTITION)?.get(id)?))
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, BuildError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, BuildError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| BuildError::Internal(format!("store task failed: {}", e)))?
}
