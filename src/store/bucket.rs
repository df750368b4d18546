//! Typed access to one partition inside a transaction.

use std::ops::Deref;

use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::codec::{self, CodecError};
use super::error::StoreError;
use super::partition::PartitionName;

/// Read access to a partition, valid for the life of its transaction
pub struct ReadBucket<'t> {
    conn: &'t Connection,
    partition: &'t PartitionName,
}

/// Read/write access to a partition inside a write transaction
pub struct WriteBucket<'t> {
    inner: ReadBucket<'t>,
}

/// Records collected by [`ReadBucket::scan`]
#[derive(Debug)]
pub struct Scan<T> {
    /// Records that decoded successfully, in key order
    pub records: Vec<T>,

    /// Keys whose stored value could not be decoded
    pub failures: Vec<(String, StoreError)>,
}

impl<T> Default for Scan<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<'t> ReadBucket<'t> {
    pub(crate) fn new(conn: &'t Connection, partition: &'t PartitionName) -> Self {
        Self { conn, partition }
    }

    pub fn name(&self) -> &str {
        self.partition.as_str()
    }

    /// Read and decode the record stored under `key`
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, StoreError> {
        let sql = format!("SELECT value FROM {} WHERE key = ?1", self.partition.table());
        let value: Option<Value> = self
            .conn
            .query_row(&sql, params![key], |row| row.get(0))
            .optional()?;

        let value = value.ok_or_else(|| StoreError::NotFound {
            partition: self.partition.to_string(),
            key: key.to_string(),
        })?;

        self.decode(key, value)
    }

    /// Check whether a record exists under `key`
    pub fn contains(&self, key: &str) -> Result<bool, StoreError> {
        let sql = format!("SELECT 1 FROM {} WHERE key = ?1", self.partition.table());
        let found = self
            .conn
            .query_row(&sql, params![key], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    /// Number of records in the partition
    pub fn len(&self) -> Result<usize, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.partition.table());
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Visit every record in ascending key order.
    ///
    /// A record that fails to decode is passed to `visit` as an error and
    /// iteration carries on; the visitor decides whether that should stop the
    /// walk by returning `Err`. Engine failures always stop it.
    pub fn for_each<T, E, F>(&self, mut visit: F) -> Result<(), E>
    where
        T: DeserializeOwned,
        E: From<StoreError>,
        F: FnMut(&str, Result<T, StoreError>) -> Result<(), E>,
    {
        let sql = format!("SELECT key, value FROM {} ORDER BY key", self.partition.table());
        let mut stmt = self.conn.prepare(&sql).map_err(StoreError::from)?;
        let mut rows = stmt.query([]).map_err(StoreError::from)?;

        while let Some(row) = rows.next().map_err(StoreError::from)? {
            let key: String = row.get(0).map_err(StoreError::from)?;
            let value: Value = row.get(1).map_err(StoreError::from)?;
            let record = self.decode(&key, value);
            visit(&key, record)?;
        }

        Ok(())
    }

    /// Decode every record, setting aside the ones that fail
    pub fn scan<T: DeserializeOwned>(&self) -> Result<Scan<T>, StoreError> {
        let mut scan = Scan::default();

        self.for_each(|key, record: Result<T, StoreError>| {
            match record {
                Ok(record) => scan.records.push(record),
                Err(err) => scan.failures.push((key.to_string(), err)),
            }
            Ok::<_, StoreError>(())
        })?;

        Ok(scan)
    }

    fn decode<T: DeserializeOwned>(&self, key: &str, value: Value) -> Result<T, StoreError> {
        let decoded = match value {
            Value::Blob(bytes) => codec::decode(&bytes),
            Value::Text(text) => codec::decode(text.as_bytes()),
            Value::Null => Err(CodecError::UnexpectedType("null")),
            Value::Integer(_) => Err(CodecError::UnexpectedType("integer")),
            Value::Real(_) => Err(CodecError::UnexpectedType("real")),
        };

        decoded.map_err(|source| StoreError::Decode {
            partition: self.partition.to_string(),
            key: key.to_string(),
            source,
        })
    }
}

impl<'t> WriteBucket<'t> {
    pub(crate) fn new(conn: &'t Connection, partition: &'t PartitionName) -> Self {
        Self {
            inner: ReadBucket::new(conn, partition),
        }
    }

    /// Encode `record` and store it under `key`, replacing any previous value
    pub fn put<T: Serialize>(&self, key: &str, record: &T) -> Result<(), StoreError> {
        let bytes = codec::encode(record).map_err(|source| StoreError::Encode {
            partition: self.inner.partition.to_string(),
            key: key.to_string(),
            source,
        })?;

        let sql = format!(
            "INSERT INTO {} (key, value) VALUES (?1, ?2) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            self.inner.partition.table()
        );
        self.inner.conn.execute(&sql, params![key, bytes])?;

        Ok(())
    }
}

impl<'t> Deref for WriteBucket<'t> {
    type Target = ReadBucket<'t>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
