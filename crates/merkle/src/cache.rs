//! Hash cache (§4.3, C3) and its companion session state. A deterministic,
//! fixed-capacity, direct-mapped set: eviction is a pure function of the
//! insert sequence, so client and server sessions stay bit-identical.

use primitives::{Hash, HashBlock};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HashCache {
    capacity: usize,
    slots: Vec<Hash>,
}

impl HashCache {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "hash cache capacity must be > 0");
        Self { capacity, slots: vec![Hash::NULL; capacity] }
    }

    fn slot(&self, h: &Hash) -> usize {
        (h.low_bits() % self.capacity as u64) as usize
    }

    /// Direct-mapped insert: evicts whatever previously occupied the slot.
    pub fn insert(&mut self, h: Hash) {
        let slot = self.slot(&h);
        self.slots[slot] = h;
    }

    pub fn contains(&self, h: &Hash) -> bool {
        // The Null Hash is never "proven"; an empty slot reads as Null and
        // must not be confused with a genuine cached Null Hash lookup.
        if h.is_null() {
            return false;
        }
        self.slots[self.slot(h)] == *h
    }

    /// Re-applies a prior session's cache contents in order, for
    /// `startCache` (§4.4.3). Must be called with the exact insertion
    /// order the two peers originally observed, or the caches diverge.
    pub fn replay(&mut self, hashes: &[Hash]) {
        for h in hashes {
            self.insert(*h);
        }
    }
}

/// Per-Reader-session state held alongside the cache (§4.3): the last
/// proven HashBlock and the last signed root, both initialized to Null.
#[derive(Clone, Debug)]
pub struct CacheState {
    pub cache: HashCache,
    pub last_proven_block: HashBlock,
    pub last_signed_root: Hash,
}

impl CacheState {
    pub fn new(capacity: usize, fanout: usize) -> Self {
        Self {
            cache: HashCache::new(capacity),
            last_proven_block: HashBlock::new(vec![Hash::NULL; fanout]),
            last_signed_root: Hash::NULL,
        }
    }

    /// A SignedHash for `root` is accepted: the *previous* last-signed-root
    /// moves into the cache, and `root` becomes the new last-signed-root.
    pub fn accept_signed_hash(&mut self, root: Hash) {
        if !self.last_signed_root.is_null() {
            self.cache.insert(self.last_signed_root);
        }
        self.last_signed_root = root;
    }

    /// A HashBlock is accepted: the *previous* last-proven-block's name
    /// moves into the cache, and `block` becomes the new last-proven-block.
    pub fn accept_hash_block(&mut self, block: HashBlock) {
        let prev_name = crypto::h(&self.last_proven_block.encoding());
        if !self.last_proven_block.children.iter().all(|c| c.is_null()) {
            self.cache.insert(prev_name);
        }
        self.last_proven_block = block;
    }

    /// Whether `t` is anchored by the proof stream processed so far.
    pub fn proves(&self, t: &Hash) -> bool {
        self.last_proven_block.contains(t) || self.cache.contains(t)
    }
}
