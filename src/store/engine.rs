//! SQLite-backed transactional record store.
//!
//! Each registered partition is a two-column table keyed by record id.
//! Writes go through a single writer connection; reads use a small pool of
//! read-only connections so that, under WAL, they see a consistent snapshot
//! without waiting on the writer.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rusqlite::{Connection, OpenFlags, Transaction, TransactionBehavior};
use tracing::{debug, info};

use super::bucket::{ReadBucket, WriteBucket};
use super::error::StoreError;
use super::partition::{PartitionName, StoreConfig};

/// Handle to an open store. Cheap to clone and safe to share across threads.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    path: PathBuf,
    partitions: BTreeSet<PartitionName>,
    writer: Mutex<Connection>,
    readers: Vec<Mutex<Connection>>,
    read_cursor: AtomicUsize,
}

/// A write transaction. Committed when the `update` closure returns `Ok`.
pub struct WriteTxn<'c> {
    tx: Transaction<'c>,
    partitions: &'c BTreeSet<PartitionName>,
}

/// A read transaction over a consistent snapshot
pub struct ReadTxn<'c> {
    tx: Transaction<'c>,
    partitions: &'c BTreeSet<PartitionName>,
}

impl Store {
    /// Open (or create) the store and make sure every configured partition exists
    pub fn open(config: StoreConfig) -> Result<Self, StoreError> {
        let partitions = config
            .partitions()
            .iter()
            .map(|name| PartitionName::new(name))
            .collect::<Result<BTreeSet<_>, _>>()?;

        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut writer = open_connection(
            &config,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;
        writer.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
        create_partitions(&mut writer, &partitions)?;

        let readers = (0..config.read_connections.max(1))
            .map(|_| open_connection(&config, OpenFlags::SQLITE_OPEN_READ_ONLY).map(Mutex::new))
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            path = %config.path.display(),
            partitions = partitions.len(),
            readers = readers.len(),
            "Opened record store"
        );

        Ok(Self {
            inner: Arc::new(StoreInner {
                path: config.path,
                partitions,
                writer: Mutex::new(writer),
                readers,
                read_cursor: AtomicUsize::new(0),
            }),
        })
    }

    /// Path to the database file
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Registered partition names
    pub fn partitions(&self) -> impl Iterator<Item = &str> {
        self.inner.partitions.iter().map(PartitionName::as_str)
    }

    /// Run `f` inside a write transaction.
    ///
    /// The transaction commits if `f` returns `Ok` and rolls back otherwise,
    /// so no partial write from a failed closure is ever visible.
    pub fn update<R, E, F>(&self, f: F) -> Result<R, E>
    where
        E: From<StoreError>,
        F: FnOnce(&WriteTxn<'_>) -> Result<R, E>,
    {
        let mut conn = self.inner.writer.lock().map_err(|_| StoreError::Poisoned)?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;
        let txn = WriteTxn {
            tx,
            partitions: &self.inner.partitions,
        };

        let result = f(&txn)?;
        txn.tx.commit().map_err(StoreError::from)?;
        debug!("Committed write transaction");

        Ok(result)
    }

    /// Run `f` inside a read-only transaction
    pub fn view<R, E, F>(&self, f: F) -> Result<R, E>
    where
        E: From<StoreError>,
        F: FnOnce(&ReadTxn<'_>) -> Result<R, E>,
    {
        let mut conn = self.reader().lock().map_err(|_| StoreError::Poisoned)?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Deferred)
            .map_err(StoreError::from)?;
        let txn = ReadTxn {
            tx,
            partitions: &self.inner.partitions,
        };

        let result = f(&txn)?;
        txn.tx.finish().map_err(StoreError::from)?;

        Ok(result)
    }

    fn reader(&self) -> &Mutex<Connection> {
        let readers = &self.inner.readers;
        let index = self.inner.read_cursor.fetch_add(1, Ordering::Relaxed) % readers.len();
        &readers[index]
    }
}

impl<'c> WriteTxn<'c> {
    /// Access a registered partition for reading and writing
    pub fn bucket(&self, name: &str) -> Result<WriteBucket<'_>, StoreError> {
        let partition = lookup(self.partitions, name)?;
        Ok(WriteBucket::new(&self.tx, partition))
    }
}

impl<'c> ReadTxn<'c> {
    /// Access a registered partition for reading
    pub fn bucket(&self, name: &str) -> Result<ReadBucket<'_>, StoreError> {
        let partition = lookup(self.partitions, name)?;
        Ok(ReadBucket::new(&self.tx, partition))
    }
}

fn lookup<'a>(
    partitions: &'a BTreeSet<PartitionName>,
    name: &str,
) -> Result<&'a PartitionName, StoreError> {
    partitions
        .get(name)
        .ok_or_else(|| StoreError::MissingPartition(name.to_string()))
}

fn open_connection(config: &StoreConfig, flags: OpenFlags) -> Result<Connection, StoreError> {
    let conn = Connection::open_with_flags(&config.path, flags | OpenFlags::SQLITE_OPEN_NO_MUTEX)?;
    conn.busy_timeout(config.busy_timeout)?;
    Ok(conn)
}

/// Create every partition table in one transaction
fn create_partitions(
    conn: &mut Connection,
    partitions: &BTreeSet<PartitionName>,
) -> Result<(), StoreError> {
    let tx = conn.transaction()?;
    for partition in partitions {
        tx.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (key TEXT PRIMARY KEY NOT NULL, value BLOB NOT NULL) WITHOUT ROWID;",
            partition.table()
        ))?;
        debug!(partition = %partition, "Partition ready");
    }
    tx.commit()?;
    Ok(())
}
