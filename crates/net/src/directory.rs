//! What a role session needs from the server's registry of open
//! Datacapsules, expressed as a trait so `net` never depends on `server`
//! (dependency points the other way: `server` depends on `net`).

use std::sync::Arc;

use primitives::DatacapsuleId;

pub trait CapsuleDirectory: Send + Sync {
    fn get(&self, id: &DatacapsuleId) -> Option<Arc<capsule::CapsuleState>>;

    fn create(&self, id: DatacapsuleId, meta: storage::CapsuleMeta) -> Result<Arc<capsule::CapsuleState>, storage::StorageError>;

    fn store(&self) -> &storage::Store;

    fn server_keypair(&self) -> &crypto::Keypair;

    fn merkle_fanout(&self) -> usize;

    fn sig_avoid_max_extra_hashes(&self) -> usize;

    fn hash_cache_capacity(&self) -> usize;
}
