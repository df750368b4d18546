//! Generic transactional record store.
//!
//! Records of any serde type are kept as encoded bytes in named partitions
//! of a single embedded database:
//! - codec: record <-> bytes
//! - partition: partition names and the store configuration
//! - engine: opening the store and running transactions
//! - bucket: put/get/iterate inside a transaction

pub mod bucket;
pub mod codec;
pub mod engine;
pub mod error;
pub mod partition;

pub use bucket::{ReadBucket, Scan, WriteBucket};
pub use codec::{decode, encode, CodecError};
pub use engine::{ReadTxn, Store, WriteTxn};
pub use error::StoreError;
pub use partition::{PartitionName, StoreConfig, DEFAULT_BUSY_TIMEOUT, DEFAULT_READ_CONNECTIONS};
