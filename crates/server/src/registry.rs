//! Registry of open Datacapsules (§4.5, §9): one `CapsuleState` per
//! Datacapsule, keyed by id, rehydrated from `storage` at startup and
//! shared by `Arc` across every connection. Implements `net`'s
//! `CapsuleDirectory` so connection sessions never touch `storage` or
//! `capsule` construction directly.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use merkle::ProofSource;
use primitives::DatacapsuleId;

pub struct Registry {
    store: storage::Store,
    server_keypair: crypto::Keypair,
    config: primitives::Config,
    capsules: RwLock<HashMap<DatacapsuleId, Arc<capsule::CapsuleState>>>,
}

impl Registry {
    /// Opens `store`, then reconstructs `CapsuleState` for every Datacapsule
    /// already on disk (§4.5 "reconstructed on startup from persistent
    /// tables").
    pub fn open(store: storage::Store, server_keypair: crypto::Keypair, config: primitives::Config) -> storage::Result<Self> {
        let mut capsules = HashMap::new();
        for id in store.list_capsule_ids()? {
            let meta = store.meta(&id)?.expect("list_capsule_ids only returns ids with a capsule_meta row");
            let latest = store.latest(&id)?.map(|row| {
                let sig = store
                    .view(id)
                    .signed_root(&row.latest_root)
                    .expect("a persisted latest_root must have a matching sigblocks row")
                    .sig;
                (row.latest_seq, row.latest_root, sig)
            });
            let state = Arc::new(capsule::CapsuleState::reconstruct(
                id,
                meta.creator_pubkey,
                meta.creator_sig,
                meta.writer_pubkey,
                meta.description,
                latest,
            ));
            capsules.insert(id, state);
        }
        tracing::info!(count = capsules.len(), "rehydrated datacapsules from storage");
        Ok(Self { store, server_keypair, config, capsules: RwLock::new(capsules) })
    }
}

impl net::CapsuleDirectory for Registry {
    fn get(&self, id: &DatacapsuleId) -> Option<Arc<capsule::CapsuleState>> {
        self.capsules.read().expect("registry lock poisoned").get(id).cloned()
    }

    fn create(&self, id: DatacapsuleId, meta: storage::CapsuleMeta) -> Result<Arc<capsule::CapsuleState>, storage::StorageError> {
        self.store.create_capsule(&id, meta.clone())?;
        let state = Arc::new(capsule::CapsuleState::new(id, meta.creator_pubkey, meta.creator_sig, meta.writer_pubkey, meta.description));
        self.capsules.write().expect("registry lock poisoned").insert(id, state.clone());
        Ok(state)
    }

    fn store(&self) -> &storage::Store {
        &self.store
    }

    fn server_keypair(&self) -> &crypto::Keypair {
        &self.server_keypair
    }

    fn merkle_fanout(&self) -> usize {
        self.config.merkle_fanout
    }

    fn sig_avoid_max_extra_hashes(&self) -> usize {
        self.config.sig_avoid_max_extra_hashes
    }

    fn hash_cache_capacity(&self) -> usize {
        self.config.hash_cache_capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use net::CapsuleDirectory;

    fn sample_config() -> primitives::Config {
        primitives::Config::default()
    }

    #[tokio::test]
    async fn empty_store_rehydrates_to_empty_registry() {
        let dir = tempfile::tempdir().unwrap();
        let store = storage::Store::open(dir.path()).await.unwrap();
        let registry = Registry::open(store, crypto::Keypair::generate(), sample_config()).unwrap();
        assert!(registry.get(&DatacapsuleId(primitives::Hash::NULL)).is_none());
    }

    #[tokio::test]
    async fn created_capsule_is_retrievable() {
        let dir = tempfile::tempdir().unwrap();
        let store = storage::Store::open(dir.path()).await.unwrap();
        let registry = Registry::open(store, crypto::Keypair::generate(), sample_config()).unwrap();

        let creator = crypto::Keypair::generate();
        let writer = crypto::Keypair::generate();
        let id = crypto::datacapsule_id(&creator.public, &writer.public, b"d");
        registry
            .create(
                id,
                storage::CapsuleMeta {
                    creator_pubkey: creator.public,
                    creator_sig: primitives::Signature([0u8; 64]),
                    writer_pubkey: writer.public,
                    description: b"d".to_vec(),
                },
            )
            .unwrap();

        assert!(registry.get(&id).is_some());
    }
}
