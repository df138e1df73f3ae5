//! RocksDB-backed persistence schema and commit write path (C4, §4.6).

pub mod error;
pub mod rows;
pub mod schema;
pub mod store;

pub use error::{Result, StorageError};
pub use rows::{CapsuleMeta, LatestRow, RecordBlockRow, TreeBlockRow};
pub use store::{CapsuleView, CommitBatch, NewRecord, NewTreeBlock, Store};
