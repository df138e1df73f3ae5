//! `H(bytes) -> Hash` — the one hash function every stored name is defined
//! against (§4.1, §3 "Name-content binding"). No domain separation tag: the
//! spec pins `name(x) = H(bytes(x))` exactly, so a tagged hash would break
//! the invariant that clients and server agree on names independently.

use blake2b_simd::Params;
use primitives::{Hash, HASH_WIDTH};

pub fn h(bytes: &[u8]) -> Hash {
    let digest = Params::new().hash_length(HASH_WIDTH).hash(bytes);
    Hash::from_slice(digest.as_bytes()).expect("blake2b_simd hash_length matches HASH_WIDTH")
}

/// Convenience for the Datacapsule identifier: `H(creator_pubkey ||
/// writer_pubkey || description)` (§3).
pub fn datacapsule_id(
    creator_pubkey: &primitives::PubKey,
    writer_pubkey: &primitives::PubKey,
    description: &[u8],
) -> primitives::DatacapsuleId {
    let mut buf = Vec::with_capacity(64 + description.len());
    buf.extend_from_slice(&creator_pubkey.0);
    buf.extend_from_slice(&writer_pubkey.0);
    buf.extend_from_slice(description);
    primitives::DatacapsuleId(h(&buf))
}
