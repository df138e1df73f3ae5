//! The Writer's `commit()` operation (§4.4.2): build the tree over the
//! uncommitted set, verify it against what the client claims, persist, and
//! advance the Datacapsule's frontier.

use primitives::{Hash, SignedHash};

use crate::error::CommitError;
use crate::state::CapsuleState;

pub struct UncommittedRecord {
    pub hash: Hash,
    pub ciphertext: Vec<u8>,
}

/// Builds the tree, checks it against the client's claimed root and
/// signature, persists the commit, advances `state`, and returns the
/// server's own corroborating signature over the same root (distinct from
/// the writer's `client_signed_root`, which is what gets persisted and
/// later re-verified by readers).
#[allow(clippy::too_many_arguments)]
pub async fn commit(
    store: &storage::Store,
    state: &CapsuleState,
    server_keypair: &crypto::Keypair,
    uncommitted: &[UncommittedRecord],
    client_root_hash: Hash,
    client_signed_root: primitives::Signature,
    include_prev_root: bool,
    fanout: usize,
) -> Result<SignedHash, CommitError> {
    let prev_root = state.latest_root();
    let extra = if include_prev_root && !prev_root.is_null() { Some(prev_root) } else { None };

    let leaves: Vec<Hash> = uncommitted.iter().map(|r| r.hash).collect();
    let built = merkle::build(&leaves, fanout, extra);

    if built.root != client_root_hash {
        return Err(CommitError::RootMismatch);
    }
    if !crypto::verify(&state.writer_pubkey, built.root.as_bytes(), &client_signed_root) {
        return Err(CommitError::BadSignature);
    }

    // Computed from the leaf's own position, not a hash lookup: two
    // uncommitted records can share a hash (identical ciphertext) and still
    // land in different level-0 blocks, so a `.find()` by hash value would
    // wrongly assign both the same parent (§8 scenario S6).
    let leaf_parent_of_index = |i: usize| -> Hash { built.levels[0].names[i / fanout] };

    let base_seq = state.latest_seq().map_or(0, |s| s + 1);
    let records: Vec<storage::NewRecord> = uncommitted
        .iter()
        .enumerate()
        .map(|(i, r)| storage::NewRecord {
            hash: r.hash,
            ciphertext: r.ciphertext.clone(),
            seq: base_seq + i as u64,
            leaf_parent: leaf_parent_of_index(i),
        })
        .collect();

    let tree_blocks: Vec<storage::NewTreeBlock> = built
        .levels
        .iter()
        .enumerate()
        .flat_map(|(lvl_idx, level)| {
            let is_root = lvl_idx + 1 == built.levels.len();
            level.blocks.iter().zip(level.names.iter()).map(move |(b, n)| storage::NewTreeBlock {
                name: *n,
                block: b.clone(),
                parent: None,
                is_signed_root: is_root,
            })
        })
        .collect();

    let signed_root = SignedHash { hash: built.root, sig: client_signed_root };
    let new_latest_seq = base_seq + uncommitted.len() as u64 - 1;

    let batch = storage::CommitBatch {
        records,
        tree_blocks,
        chained_previous_root: extra,
        signed_root,
        new_latest_seq,
    };
    store.commit(&state.id, batch).await?;

    state.advance(new_latest_seq, built.root, client_signed_root);

    let server_sig = server_keypair.sign(built.root.as_bytes());
    Ok(SignedHash { hash: built.root, sig: server_sig })
}

#[cfg(test)]
mod tests {
    use super::*;
    use primitives::DatacapsuleId;

    async fn open_state() -> (tempfile::TempDir, storage::Store, CapsuleState, crypto::Keypair, crypto::Keypair) {
        let dir = tempfile::tempdir().unwrap();
        let store = storage::Store::open(dir.path()).await.unwrap();
        let writer = crypto::Keypair::generate();
        let server = crypto::Keypair::generate();
        let id = DatacapsuleId(Hash([4u8; 32]));
        store
            .create_capsule(
                &id,
                storage::CapsuleMeta {
                    creator_pubkey: writer.public,
                    creator_sig: primitives::Signature([0u8; 64]),
                    writer_pubkey: writer.public,
                    description: b"d".to_vec(),
                },
            )
            .unwrap();
        let state = CapsuleState::new(id, writer.public, primitives::Signature([0u8; 64]), writer.public, b"d".to_vec());
        (dir, store, state, writer, server)
    }

    #[tokio::test]
    async fn successful_commit_advances_frontier_and_persists() {
        let (_dir, store, state, writer, server) = open_state().await;
        let rec = UncommittedRecord { hash: Hash([1u8; 32]), ciphertext: b"ct".to_vec() };
        let built = merkle::build(&[rec.hash], 2, None);
        let sig = writer.sign(built.root.as_bytes());

        let result = commit(&store, &state, &server, &[rec], built.root, sig, false, 2).await.unwrap();
        assert!(crypto::verify(&server.public, built.root.as_bytes(), &result.sig));
        assert_eq!(state.latest_seq(), Some(0));
        assert_eq!(store.latest(&state.id).unwrap().unwrap().latest_root, built.root);
    }

    #[tokio::test]
    async fn root_mismatch_is_rejected() {
        let (_dir, store, state, writer, server) = open_state().await;
        let rec = UncommittedRecord { hash: Hash([1u8; 32]), ciphertext: b"ct".to_vec() };
        let bogus_root = Hash([0xffu8; 32]);
        let sig = writer.sign(bogus_root.as_bytes());

        let err = commit(&store, &state, &server, &[rec], bogus_root, sig, false, 2).await.unwrap_err();
        assert!(matches!(err, CommitError::RootMismatch));
        assert_eq!(state.latest_seq(), None);
    }

    #[tokio::test]
    async fn forged_signature_is_rejected() {
        let (_dir, store, state, _writer, server) = open_state().await;
        let impostor = crypto::Keypair::generate();
        let rec = UncommittedRecord { hash: Hash([1u8; 32]), ciphertext: b"ct".to_vec() };
        let built = merkle::build(&[rec.hash], 2, None);
        let sig = impostor.sign(built.root.as_bytes());

        let err = commit(&store, &state, &server, &[rec], built.root, sig, false, 2).await.unwrap_err();
        assert!(matches!(err, CommitError::BadSignature));
    }

    /// §8 scenario S6: two records in the same commit share a hash (e.g.
    /// identical ciphertext) and land in different level-0 blocks; both
    /// sequence numbers must resolve a (possibly distinct) parent.
    #[tokio::test]
    async fn duplicate_hash_records_in_one_commit_each_get_a_usable_parent() {
        let (_dir, store, state, writer, server) = open_state().await;
        let dup = Hash([5u8; 32]);
        let other = Hash([6u8; 32]);
        let records = vec![
            UncommittedRecord { hash: dup, ciphertext: b"dup".to_vec() },
            UncommittedRecord { hash: other, ciphertext: b"other".to_vec() },
            UncommittedRecord { hash: dup, ciphertext: b"dup".to_vec() },
        ];
        let leaves: Vec<Hash> = records.iter().map(|r| r.hash).collect();
        let built = merkle::build(&leaves, 2, None);
        let sig = writer.sign(built.root.as_bytes());

        commit(&store, &state, &server, &records, built.root, sig, false, 2).await.unwrap();

        assert_eq!(state.latest_seq(), Some(2));
        assert_eq!(store.name_from_num(&state.id, 0).unwrap().unwrap(), dup);
        assert_eq!(store.name_from_num(&state.id, 1).unwrap().unwrap(), other);
        assert_eq!(store.name_from_num(&state.id, 2).unwrap().unwrap(), dup);

        let view = store.view(state.id);
        use merkle::ProofSource;
        let parent = view.containing_block(&dup).unwrap();
        assert!(view.block(&parent).unwrap().contains(&dup));
    }
}
