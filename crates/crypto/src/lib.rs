//! The crypto primitives façade (§4.1, C1): `H`, `sign`, `verify`, `enc`,
//! `dec`. Pure functions, no I/O — every other crate depends on this one
//! instead of reaching for a hash or signature crate directly.

pub mod cipher;
pub mod digest;
pub mod sign;

pub use cipher::{dec, enc, CipherError};
pub use digest::{datacapsule_id, h};
pub use sign::{verify, verify_checked, CryptoError, Keypair};
