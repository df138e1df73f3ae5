//! Datacapsule server orchestration: the registry of open Datacapsules and
//! the TCP accept loop, wired together by `capsuled`.

pub mod accept;
pub mod registry;

pub use accept::serve;
pub use registry::Registry;
