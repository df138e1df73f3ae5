//! Per-Datacapsule in-memory state (C5, §4.5): identity, the mutable
//! commit frontier, the writer-exclusivity lock, and the notify hub.

use std::sync::{Arc, RwLock};

use primitives::{DatacapsuleId, Hash, PubKey, Signature};
use tokio::sync::Mutex as AsyncMutex;

use crate::error::CapsuleError;
use crate::notify::NotifyHub;

struct Frontier {
    latest_seq: Option<u64>,
    latest_root: Hash,
    latest_signed_root: Signature,
}

pub struct CapsuleState {
    pub id: DatacapsuleId,
    pub creator_pubkey: PubKey,
    pub creator_sig: Signature,
    pub writer_pubkey: PubKey,
    pub description: Vec<u8>,
    frontier: RwLock<Frontier>,
    writer_lock: Arc<AsyncMutex<()>>,
    notify: NotifyHub,
}

impl CapsuleState {
    /// Fresh Datacapsule, nothing committed yet.
    pub fn new(id: DatacapsuleId, creator_pubkey: PubKey, creator_sig: Signature, writer_pubkey: PubKey, description: Vec<u8>) -> Self {
        Self::reconstruct(id, creator_pubkey, creator_sig, writer_pubkey, description, None)
    }

    /// Rebuilds state from what `storage` persisted, for server startup.
    pub fn reconstruct(
        id: DatacapsuleId,
        creator_pubkey: PubKey,
        creator_sig: Signature,
        writer_pubkey: PubKey,
        description: Vec<u8>,
        latest: Option<(u64, Hash, Signature)>,
    ) -> Self {
        let (latest_seq, latest_root, latest_signed_root) = match latest {
            Some((seq, root, sig)) => (Some(seq), root, sig),
            None => (None, Hash::NULL, Signature([0u8; primitives::SIGNATURE_WIDTH])),
        };
        let notify_seed = latest_seq.unwrap_or(u64::MAX);
        Self {
            id,
            creator_pubkey,
            creator_sig,
            writer_pubkey,
            description,
            frontier: RwLock::new(Frontier { latest_seq, latest_root, latest_signed_root }),
            writer_lock: Arc::new(AsyncMutex::new(())),
            notify: NotifyHub::new(notify_seed),
        }
    }

    pub fn latest_seq(&self) -> Option<u64> {
        self.frontier.read().expect("capsule frontier lock poisoned").latest_seq
    }

    pub fn latest_root(&self) -> Hash {
        self.frontier.read().expect("capsule frontier lock poisoned").latest_root
    }

    /// At most one Writer session may hold this at a time (§5); a second
    /// concurrent attempt is refused rather than queued.
    pub fn try_acquire_writer(&self) -> Result<tokio::sync::OwnedMutexGuard<()>, CapsuleError> {
        self.writer_lock.clone().try_lock_owned().map_err(|_| CapsuleError::Contention)
    }

    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<u64> {
        self.notify.subscribe()
    }

    /// Records a successful commit's new frontier and wakes subscribers.
    pub fn advance(&self, new_latest_seq: u64, new_root: Hash, new_signed_root: Signature) {
        {
            let mut f = self.frontier.write().expect("capsule frontier lock poisoned");
            f.latest_seq = Some(new_latest_seq);
            f.latest_root = new_root;
            f.latest_signed_root = new_signed_root;
        }
        self.notify.publish(new_latest_seq);
    }
}
