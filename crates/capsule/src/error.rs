use thiserror::Error;

#[derive(Debug, Error)]
pub enum CapsuleError {
    #[error("a writer session is already active for this datacapsule")]
    Contention,
}

#[derive(Debug, Error)]
pub enum CommitError {
    #[error("commit root does not match the tree built from the uncommitted set")]
    RootMismatch,
    #[error("writer signature does not verify over the committed root")]
    BadSignature,
    #[error(transparent)]
    Storage(#[from] storage::StorageError),
}
