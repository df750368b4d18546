//! Record Store Integration Tests
//!
//! Tests for the generic store shared by several entity kinds: atomicity
//! across partitions, snapshot reads, and corrupt values.

use std::thread;

use buildledger::store::{Store, StoreConfig, StoreError};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Deployment {
    id: String,
    target: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Release {
    id: String,
    url: String,
}

fn open_store(temp: &TempDir) -> Store {
    let config = StoreConfig::new(temp.path().join("nested").join("state.db"))
        .with_partitions(["deployment", "release"])
        .with_read_connections(2);
    Store::open(config).unwrap()
}

fn deployment(id: &str) -> Deployment {
    Deployment {
        id: id.to_string(),
        target: "prod".to_string(),
    }
}

#[test]
fn test_multiple_entity_kinds_share_store() {
    let temp = TempDir::new().unwrap();
    let store = open_store(&temp);

    store
        .update(|tx| {
            tx.bucket("deployment")?.put("d1", &deployment("d1"))?;
            tx.bucket("release")?.put(
                "r1",
                &Release {
                    id: "r1".to_string(),
                    url: "https://example.test/r1".to_string(),
                },
            )
        })
        .unwrap();

    let (d, r) = store
        .view(|tx| {
            let d: Deployment = tx.bucket("deployment")?.get("d1")?;
            let r: Release = tx.bucket("release")?.get("r1")?;
            Ok::<_, StoreError>((d, r))
        })
        .unwrap();

    assert_eq!(d, deployment("d1"));
    assert_eq!(r.url, "https://example.test/r1");
}

#[test]
fn test_failure_rolls_back_every_partition() {
    let temp = TempDir::new().unwrap();
    let store = open_store(&temp);

    let result = store.update(|tx| {
        tx.bucket("deployment")?.put("d1", &deployment("d1"))?;
        tx.bucket("missing")?.put("x", &deployment("x"))
    });
    assert!(matches!(result, Err(StoreError::MissingPartition(_))));

    let empty = store
        .view(|tx| tx.bucket("deployment")?.is_empty())
        .unwrap();
    assert!(empty);
}

#[test]
fn test_read_sees_consistent_snapshot() {
    let temp = TempDir::new().unwrap();
    let store = open_store(&temp);

    store
        .update(|tx| tx.bucket("deployment")?.put("d1", &deployment("d1")))
        .unwrap();

    let (before, after) = store
        .view(|tx| {
            let bucket = tx.bucket("deployment")?;
            let before = bucket.len()?;

            let writer = store.clone();
            thread::spawn(move || {
                writer
                    .update(|tx| tx.bucket("deployment")?.put("d2", &deployment("d2")))
                    .unwrap();
            })
            .join()
            .unwrap();

            let after = bucket.len()?;
            Ok::<_, StoreError>((before, after))
        })
        .unwrap();

    assert_eq!(before, 1);
    assert_eq!(after, 1);

    let now = store
        .view(|tx| tx.bucket("deployment")?.len())
        .unwrap();
    assert_eq!(now, 2);
}

#[test]
fn test_scan_reports_incompatible_records() {
    let temp = TempDir::new().unwrap();
    let store = open_store(&temp);

    store
        .update(|tx| {
            let bucket = tx.bucket("deployment")?;
            bucket.put("a", &deployment("a"))?;
            bucket.put(
                "b",
                &Release {
                    id: "b".to_string(),
                    url: "wrong kind".to_string(),
                },
            )?;
            bucket.put("c", &deployment("c"))
        })
        .unwrap();

    let scan = store
        .view(|tx| tx.bucket("deployment")?.scan::<Deployment>())
        .unwrap();

    assert_eq!(scan.records, vec![deployment("a"), deployment("c")]);
    assert_eq!(scan.failures.len(), 1);
    assert_eq!(scan.failures[0].0, "b");
}

#[test]
fn test_contains_and_len() {
    let temp = TempDir::new().unwrap();
    let store = open_store(&temp);

    store
        .update(|tx| {
            let bucket = tx.bucket("deployment")?;
            bucket.put("d1", &deployment("d1"))?;
            bucket.put("d2", &deployment("d2"))
        })
        .unwrap();

    let (has_d1, has_d3, len) = store
        .view(|tx| {
            let bucket = tx.bucket("deployment")?;
            Ok::<_, StoreError>((bucket.contains("d1")?, bucket.contains("d3")?, bucket.len()?))
        })
        .unwrap();

    assert!(has_d1);
    assert!(!has_d3);
    assert_eq!(len, 2);
}
