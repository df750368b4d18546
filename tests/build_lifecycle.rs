//! Build Lifecycle Integration Tests
//!
//! Tests for create/complete/list against an on-disk store, through both the
//! service and the transport-facing API trait.

use std::collections::HashSet;

use buildledger::core::{
    required_partitions, BuildApi, CompleteBuildRequest, CreateBuildRequest, GetBuildRequest,
    BUILD_PARTITION,
};
use buildledger::{
    Artifact, BuildError, BuildFailure, BuildResult, BuildService, BuildState, Component, Store,
    StoreConfig, StoreError,
};
use rusqlite::{params, Connection};
use tempfile::TempDir;

fn open_service(temp: &TempDir) -> BuildService {
    let config = StoreConfig::new(temp.path().join("state.db")).with_partitions(required_partitions());
    BuildService::new(Store::open(config).unwrap())
}

#[tokio::test]
async fn test_create_complete_list_scenario() {
    let temp = TempDir::new().unwrap();
    let service = open_service(&temp);

    let id = service.create(Component::builder("svc-a")).await.unwrap();
    assert!(!id.is_empty());

    let listing = service.list().await.unwrap();
    assert_eq!(listing.builds.len(), 1);
    assert_eq!(listing.builds[0].id, id);
    assert_eq!(listing.builds[0].status.state, BuildState::Running);

    service
        .complete(&id, BuildResult::Artifact(Artifact::new("bin-xyz")))
        .await
        .unwrap();

    let listing = service.list().await.unwrap();
    assert_eq!(listing.builds.len(), 1);
    let build = &listing.builds[0];
    assert_eq!(build.id, id);
    assert_eq!(build.status.state, BuildState::Success);
    assert_eq!(build.artifact.as_ref().unwrap().content, "bin-xyz");
    assert!(build.status.complete_time.is_some());
    assert!(build.status.complete_time.unwrap() >= build.status.start_time);
    assert!(build.check_consistency().is_ok());
}

#[tokio::test]
async fn test_ids_are_unique() {
    let temp = TempDir::new().unwrap();
    let service = open_service(&temp);

    let mut ids = HashSet::new();
    for i in 0..20 {
        let id = service
            .create(Component::builder(format!("svc-{}", i)))
            .await
            .unwrap();
        assert!(ids.insert(id), "id returned twice");
    }

    let listing = service.list().await.unwrap();
    assert_eq!(listing.builds.len(), 20);
}

#[tokio::test]
async fn test_concurrent_creates_and_completes() {
    let temp = TempDir::new().unwrap();
    let service = open_service(&temp);

    let mut handles = Vec::new();
    for i in 0..16 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            let id = service
                .create(Component::builder(format!("svc-{}", i)))
                .await?;
            let result = if i % 2 == 0 {
                BuildResult::Artifact(Artifact::new(format!("bin-{}", i)))
            } else {
                BuildResult::Error(BuildFailure::new(2, format!("failed {}", i)))
            };
            service.complete(&id, result).await?;
            Ok::<_, BuildError>(id)
        }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let listing = service.list().await.unwrap();
    assert_eq!(listing.builds.len(), 16);
    let succeeded = listing
        .builds
        .iter()
        .filter(|b| b.status.state == BuildState::Success)
        .count();
    assert_eq!(succeeded, 8);
    assert!(listing.builds.iter().all(|b| b.check_consistency().is_ok()));
}

#[tokio::test]
async fn test_complete_unknown_id_leaves_store_unchanged() {
    let temp = TempDir::new().unwrap();
    let service = open_service(&temp);
    let id = service.create(Component::builder("svc-a")).await.unwrap();

    let err = service
        .complete("does-not-exist", BuildResult::Artifact(Artifact::new("x")))
        .await
        .unwrap_err();
    assert!(matches!(err, BuildError::NotFound(_)));
    assert!(!err.is_retryable());

    let listing = service.list().await.unwrap();
    assert_eq!(listing.builds.len(), 1);
    assert_eq!(listing.builds[0].id, id);
    assert!(listing.builds[0].is_running());
}

#[tokio::test]
async fn test_corrupt_record_does_not_abort_listing() {
    let temp = TempDir::new().unwrap();
    let service = open_service(&temp);
    let first = service.create(Component::builder("svc-a")).await.unwrap();
    let second = service.create(Component::builder("svc-b")).await.unwrap();

    let conn = Connection::open(temp.path().join("state.db")).unwrap();
    conn.execute(
        "INSERT INTO bucket_build (key, value) VALUES (?1, ?2)",
        params!["corrupt", vec![0xffu8, 0x00, 0x13]],
    )
    .unwrap();

    let listing = service.list().await.unwrap();

    let ids: HashSet<_> = listing.builds.iter().map(|b| b.id.clone()).collect();
    assert_eq!(ids, HashSet::from([first, second]));
    assert_eq!(listing.failures.len(), 1);
    assert_eq!(listing.failures[0].id, "corrupt");
    assert!(matches!(listing.failures[0].error, StoreError::Decode { .. }));

    let err = service.get("corrupt").await.unwrap_err();
    assert!(matches!(err, BuildError::Decode { ref id, .. } if id == "corrupt"));
}

#[tokio::test]
async fn test_builds_survive_reopen() {
    let temp = TempDir::new().unwrap();

    let id = {
        let service = open_service(&temp);
        let id = service.create(Component::builder("svc-a")).await.unwrap();
        service
            .complete(&id, BuildResult::Error(BuildFailure::new(9, "out of disk")))
            .await
            .unwrap();
        id
    };

    let service = open_service(&temp);
    let build = service.get(&id).await.unwrap();
    assert_eq!(build.status.state, BuildState::Error);
    assert_eq!(build.status.error, Some(BuildFailure::new(9, "out of disk")));
}

#[tokio::test]
async fn test_missing_build_partition_is_store_error() {
    let temp = TempDir::new().unwrap();
    let store = Store::open(StoreConfig::new(temp.path().join("state.db"))).unwrap();
    let service = BuildService::new(store);

    let err = service.create(Component::builder("svc-a")).await.unwrap_err();
    assert!(matches!(
        err,
        BuildError::Store(StoreError::MissingPartition(ref name)) if name == BUILD_PARTITION
    ));
}

#[tokio::test]
async fn test_api_trait_round_trip() {
    let temp = TempDir::new().unwrap();
    let api: Box<dyn BuildApi> = Box::new(open_service(&temp));

    let created = api
        .create_build(CreateBuildRequest {
            component: Component::builder("svc-a"),
        })
        .await
        .unwrap();

    api.complete_build(CompleteBuildRequest {
        id: created.id.clone(),
        result: BuildResult::Artifact(Artifact::new("bin-xyz")),
    })
    .await
    .unwrap();

    let build = api
        .get_build(GetBuildRequest {
            id: created.id.clone(),
        })
        .await
        .unwrap();
    assert_eq!(build.status.state, BuildState::Success);

    let listing = api.list_builds().await.unwrap();
    assert_eq!(listing.builds.len(), 1);
}
