//! Merkle tree builder (§4.2, C2). Deterministic: identical leaves, fanout,
//! and extra-hash produce byte-identical `HashBlock`s and root, because the
//! root is what gets signed.

use primitives::{Hash, HashBlock};

/// One level of interior nodes built from `children`, plus the node names
/// (`H(concat(children))`) in the same order.
pub struct Level {
    pub blocks: Vec<HashBlock>,
    pub names: Vec<Hash>,
}

/// The full output of a build: every interior level (leaves not included)
/// and the final root hash (the name of the single top-level block).
pub struct BuiltTree {
    pub levels: Vec<Level>,
    pub root: Hash,
}

impl BuiltTree {
    pub fn root_block(&self) -> &HashBlock {
        &self.levels.last().expect("a built tree always has at least one level").blocks[0]
    }
}

/// Builds the tree over `leaves`, optionally chaining `extra` (the previous
/// commit's signed root) in as leaf `L[n]` before fanout padding (§4.2).
/// `fanout` must be >= 2.
pub fn build(leaves: &[Hash], fanout: usize, extra: Option<Hash>) -> BuiltTree {
    assert!(fanout >= 2, "merkle fanout must be >= 2");

    let mut current: Vec<Hash> = leaves.to_vec();
    if let Some(extra_hash) = extra {
        current.push(extra_hash);
    }
    if current.is_empty() {
        current.push(Hash::NULL);
    }

    let mut levels = Vec::new();
    loop {
        let mut blocks = Vec::with_capacity(current.len().div_ceil(fanout));
        let mut names = Vec::with_capacity(blocks.capacity());
        for chunk in current.chunks(fanout) {
            let mut children = chunk.to_vec();
            children.resize(fanout, Hash::NULL);
            let block = HashBlock::new(children);
            let name = crypto::h(&block.encoding());
            names.push(name);
            blocks.push(block);
        }
        let reached_root = names.len() == 1;
        levels.push(Level { blocks, names: names.clone() });
        if reached_root {
            let root = levels.last().unwrap().names[0];
            return BuiltTree { levels, root };
        }
        current = names;
    }
}
