//! Typed session errors (§7), composed at the dispatcher boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("protocol violation: {0}")]
    Protocol(String),
    #[error("verification failed: {0}")]
    Verification(String),
    #[error("contention: {0}")]
    Contention(#[from] capsule::CapsuleError),
    #[error(transparent)]
    Storage(#[from] storage::StorageError),
    #[error(transparent)]
    Frame(#[from] proto::FrameError),
}

impl SessionError {
    /// True for a `ResourceError` naming on-disk corruption within a
    /// Datacapsule's own column families (§7): the dispatcher aborts the
    /// process rather than let the corruption silently spread to later
    /// reads of the same rows.
    pub fn is_storage_corruption(&self) -> bool {
        matches!(self, SessionError::Storage(storage::StorageError::Corrupt { .. }))
    }
}

impl From<capsule::CommitError> for SessionError {
    fn from(e: capsule::CommitError) -> Self {
        match e {
            capsule::CommitError::RootMismatch | capsule::CommitError::BadSignature => SessionError::Verification(e.to_string()),
            capsule::CommitError::Storage(s) => SessionError::Storage(s),
        }
    }
}
