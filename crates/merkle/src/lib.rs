//! Merkle tree construction, proof assembly, and the session hash cache
//! (§4.2-§4.3). Storage-agnostic: `storage` implements `proof::ProofSource`
//! to let this crate walk a chain of committed tree blocks without knowing
//! how they're persisted.

pub mod cache;
pub mod proof;
pub mod tree;

pub use cache::{CacheState, HashCache};
pub use proof::{assemble, verify_stream, ProofSource, ProofStream};
pub use tree::{build, BuiltTree, Level};
