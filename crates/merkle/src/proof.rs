//! Proof assembly and verification (§4.2, C2) plus the signature-avoidance
//! policy. Assembly is generic over a `ProofSource` so this crate stays
//! free of any storage-engine dependency; `storage` implements the trait.

use crate::cache::CacheState;
use primitives::{Hash, HashBlock, SignedHash};
use serde::{Deserialize, Serialize};

/// What the storage layer must answer to let this crate walk a Merkle
/// ancestor chain without knowing how it is persisted.
pub trait ProofSource {
    /// The stored HashBlock named `name`, if any.
    fn block(&self, name: &Hash) -> Option<HashBlock>;
    /// The name of the interior block that contains `t` as a direct child
    /// (a record's parent tree block, or a tree block's parent block).
    fn containing_block(&self, t: &Hash) -> Option<Hash>;
    /// If `name` is itself a signed root, its signature.
    fn signed_root(&self, name: &Hash) -> Option<SignedHash>;
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProofStream {
    pub signed_hash: Option<SignedHash>,
    /// Root-to-leaf order: `blocks[0]`'s name is anchored by `signed_hash`
    /// (or already by cache state), each later block's name is found in
    /// its predecessor, and the last block contains the target.
    pub blocks: Vec<HashBlock>,
}

fn name_of(block: &HashBlock) -> Hash {
    crypto::h(&block.encoding())
}

/// Assembles a proof for `target` against `source`, applying the
/// signature-avoidance policy and advancing `state` exactly as a client
/// processing the same stream would (§4.2, §4.3).
pub fn assemble(
    source: &dyn ProofSource,
    target: Hash,
    state: &mut CacheState,
    sig_avoid_max_extra_hashes: usize,
) -> Option<ProofStream> {
    if state.proves(&target) {
        return Some(ProofStream { signed_hash: None, blocks: vec![] });
    }

    // Walk from the block directly containing `target` up through parent
    // links to the outermost chained root, collecting the chain in
    // target-to-root order.
    let mut names = Vec::new();
    let mut blocks = Vec::new();
    let mut current = source.containing_block(&target)?;
    loop {
        let block = source.block(&current)?;
        names.push(current);
        blocks.push(block);
        match source.containing_block(&current) {
            Some(parent) => current = parent,
            None => break,
        }
    }
    let top_name = *names.last().unwrap();

    let already_anchored =
        |n: &Hash, state: &CacheState| state.cache.contains(n) || state.last_proven_block.contains(n);

    if already_anchored(&top_name, state) {
        return Some(finish(None, blocks, state));
    }

    let local_root_idx = names.iter().position(|n| source.signed_root(n).is_some())?;

    for idx in local_root_idx..names.len() {
        let name = names[idx];
        if source.signed_root(&name).is_none() {
            continue;
        }
        if already_anchored(&name, state) {
            let extra = idx - local_root_idx;
            if extra <= sig_avoid_max_extra_hashes {
                let truncated = blocks[..=idx].to_vec();
                return Some(finish(None, truncated, state));
            }
        }
    }

    let top_signed = source.signed_root(&top_name)?;
    Some(finish(Some(top_signed), blocks, state))
}

fn finish(signed_hash: Option<SignedHash>, mut blocks: Vec<HashBlock>, state: &mut CacheState) -> ProofStream {
    blocks.reverse(); // now root-to-leaf
    if let Some(sh) = &signed_hash {
        state.accept_signed_hash(sh.hash);
    }
    for b in &blocks {
        state.accept_hash_block(b.clone());
    }
    ProofStream { signed_hash, blocks }
}

/// Mirrors `assemble`'s per-element validation on the client (or, in
/// tests, server) side (§4.2 Verification, §8 property 6).
pub fn verify_stream(stream: &ProofStream, target: &Hash, state: &mut CacheState, writer_key_ok: impl Fn(&Hash, &primitives::Signature) -> bool) -> bool {
    if let Some(sh) = &stream.signed_hash {
        if !writer_key_ok(&sh.hash, &sh.sig) {
            return false;
        }
        state.accept_signed_hash(sh.hash);
    }

    for (i, block) in stream.blocks.iter().enumerate() {
        let name = name_of(block);
        let anchored = if i == 0 {
            match &stream.signed_hash {
                Some(sh) => sh.hash == name,
                None => state.cache.contains(&name) || state.last_proven_block.contains(&name),
            }
        } else {
            state.cache.contains(&name) || state.last_proven_block.contains(&name)
        };
        if !anchored {
            return false;
        }
        state.accept_hash_block(block.clone());
    }

    state.proves(target)
}
