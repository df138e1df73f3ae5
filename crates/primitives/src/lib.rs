//! Data-model types shared by every crate in the workspace: `Hash`,
//! `SignedHash`, `HashBlock`, `Record`, `DatacapsuleId`, and the byte-cursor
//! helpers used to encode them. See `SPEC_FULL.md` §3.

pub mod config;
pub mod encode;
pub mod types;

pub use config::*;
pub use encode::*;
pub use types::*;
