//! Value types stored in each column family (§4.6).

use primitives::{Hash, HashBlock, PubKey, Signature};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CapsuleMeta {
    pub creator_pubkey: PubKey,
    pub creator_sig: Signature,
    pub writer_pubkey: PubKey,
    pub description: Vec<u8>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct LatestRow {
    pub latest_seq: u64,
    pub latest_root: Hash,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecordBlockRow {
    pub parent_tree_hash: Hash,
    pub seq: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TreeBlockRow {
    pub block: HashBlock,
    pub parent: Option<Hash>,
    pub is_signed_root: bool,
}
