//! Per-Datacapsule in-memory state, the writer-exclusivity lock, the
//! subscriber notify hub, and the `commit()` operation (C5, C8, §4.4.2).

pub mod commit;
pub mod error;
pub mod notify;
pub mod state;

pub use commit::{commit, UncommittedRecord};
pub use error::{CapsuleError, CommitError};
pub use notify::{wait_after, NotifyHub};
pub use state::CapsuleState;
