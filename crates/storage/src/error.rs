use primitives::DatacapsuleId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("datacapsule {0} already exists")]
    AlreadyExists(DatacapsuleId),
    #[error("datacapsule {0} not found")]
    NotFound(DatacapsuleId),
    #[error("rocksdb error: {0}")]
    Rocks(#[from] rocksdb::Error),
    #[error("corrupt row in {cf}: {source}")]
    Corrupt {
        cf: &'static str,
        #[source]
        source: bincode::Error,
    },
    #[error("commit root mismatch")]
    RootMismatch,
    #[error("blocking task panicked: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, StorageError>;
