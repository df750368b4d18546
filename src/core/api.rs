//! Transport-agnostic build API.
//!
//! These are the remote operations a server exposes for builds. The wire
//! transport lives elsewhere; it only needs something implementing
//! [`BuildApi`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Build, BuildResult, Component};

use super::builds::{BuildListing, BuildService};
use super::error::BuildError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBuildRequest {
    pub component: Component,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBuildResponse {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteBuildRequest {
    pub id: String,
    pub result: BuildResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetBuildRequest {
    pub id: String,
}

pub type ListBuildsResponse = BuildListing;

/// Remote operations on builds
#[async_trait]
pub trait BuildApi: Send + Sync {
    async fn create_build(
        &self,
        request: CreateBuildRequest,
    ) -> Result<CreateBuildResponse, BuildError>;

    async fn complete_build(&self, request: CompleteBuildRequest) -> Result<(), BuildError>;

    async fn list_builds(&self) -> Result<ListBuildsResponse, BuildError>;

    async fn get_build(&self, request: GetBuildRequest) -> Result<Build, BuildError>;
}

#[async_trait]
impl BuildApi for BuildService {
    async fn create_build(
        &self,
        request: CreateBuildRequest,
    ) -> Result<CreateBuildResponse, BuildError> {
        let id = self.create(request.component).await?;
        Ok(CreateBuildResponse { id })
    }

    async fn complete_build(&self, request: CompleteBuildRequest) -> Result<(), BuildError> {
        self.complete(&request.id, request.result).await
    }

    async fn list_builds(&self) -> Result<ListBuildsResponse, BuildError> {
        self.list().await
    }

    async fn get_build(&self, request: GetBuildRequest) -> Result<Build, BuildError> {
        self.get(&request.id).await
    }
}
