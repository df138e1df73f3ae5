//! RocksDB column families and key encoding (§4.6). One physical `DB`,
//! opened with all seven column families up front, the way the penumbra
//! storage reference opens `jmt`/`nonverifiable`/... together. Every key
//! is prefixed with the owning Datacapsule id so a single `DB` serves
//! every open Datacapsule.

use primitives::{DatacapsuleId, HASH_WIDTH};

pub const CF_CAPSULE_META: &str = "capsule_meta";
pub const CF_LATEST: &str = "latest";
pub const CF_BINDATA: &str = "bindata";
pub const CF_RECORDBLOCKS: &str = "recordblocks";
pub const CF_TREEBLOCKS: &str = "treeblocks";
pub const CF_SIGBLOCKS: &str = "sigblocks";
pub const CF_SEQBLOCKS: &str = "seqblocks";

pub const ALL_COLUMN_FAMILIES: &[&str] = &[
    CF_CAPSULE_META,
    CF_LATEST,
    CF_BINDATA,
    CF_RECORDBLOCKS,
    CF_TREEBLOCKS,
    CF_SIGBLOCKS,
    CF_SEQBLOCKS,
];

/// `capsule_meta`, `latest`: one row per Datacapsule, keyed by its id alone.
pub fn capsule_key(id: &DatacapsuleId) -> Vec<u8> {
    id.0.as_bytes().to_vec()
}

/// `bindata`, `treeblocks`, `sigblocks`: keyed by the Datacapsule id followed
/// by a content hash. Content-addressed and intentionally collision-prone:
/// two records sharing a hash share one `bindata` row, which is correct —
/// it's the same ciphertext either way.
pub fn hash_key(id: &DatacapsuleId, h: &primitives::Hash) -> Vec<u8> {
    let mut k = Vec::with_capacity(HASH_WIDTH * 2);
    k.extend_from_slice(id.0.as_bytes());
    k.extend_from_slice(h.as_bytes());
    k
}

/// `recordblocks` row: Datacapsule id, hash, then the record's own seq.
/// Two records in the same commit can share a hash (identical ciphertext),
/// and each still needs its own row — they can land in different level-0
/// tree blocks, so their `parent_tree_hash` values differ.
pub fn record_key(id: &DatacapsuleId, h: &primitives::Hash, seq: u64) -> Vec<u8> {
    let mut k = record_prefix(id, h);
    k.extend_from_slice(&seq.to_be_bytes());
    k
}

/// Prefix shared by every `recordblocks` row for `h`, for the hash-only
/// lookups `merkle::ProofSource::containing_block` needs.
pub fn record_prefix(id: &DatacapsuleId, h: &primitives::Hash) -> Vec<u8> {
    let mut k = Vec::with_capacity(HASH_WIDTH * 2);
    k.extend_from_slice(id.0.as_bytes());
    k.extend_from_slice(h.as_bytes());
    k
}

const SEQ_FORWARD: u8 = 0x01;
const SEQ_REVERSE: u8 = 0x02;

/// `seqblocks` forward row: `seq -> record_hash`.
pub fn seq_forward_key(id: &DatacapsuleId, seq: u64) -> Vec<u8> {
    let mut k = Vec::with_capacity(HASH_WIDTH + 1 + 8);
    k.extend_from_slice(id.0.as_bytes());
    k.push(SEQ_FORWARD);
    k.extend_from_slice(&seq.to_be_bytes());
    k
}

/// `seqblocks` reverse row: `record_hash -> seq`. Suffixed with `seq` itself
/// so two records sharing a hash get two rows instead of one clobbering the
/// other; `num_from_name` answers from whichever sorts first.
pub fn seq_reverse_key(id: &DatacapsuleId, record_hash: &primitives::Hash, seq: u64) -> Vec<u8> {
    let mut k = seq_reverse_prefix(id, record_hash);
    k.extend_from_slice(&seq.to_be_bytes());
    k
}

/// Prefix shared by every `seqblocks` reverse row for `record_hash`.
pub fn seq_reverse_prefix(id: &DatacapsuleId, record_hash: &primitives::Hash) -> Vec<u8> {
    let mut k = Vec::with_capacity(HASH_WIDTH + 1 + HASH_WIDTH);
    k.extend_from_slice(id.0.as_bytes());
    k.push(SEQ_REVERSE);
    k.extend_from_slice(record_hash.as_bytes());
    k
}
