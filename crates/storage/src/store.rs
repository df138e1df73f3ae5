//! RocksDB-backed persistence (C4, §4.6). `Store` is cheaply clonable (an
//! `Arc<DB>` handle); every Datacapsule shares the same physical database,
//! partitioned by column family and, within each, by Datacapsule id prefix.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use primitives::{DatacapsuleId, Hash, HashBlock, SignedHash};
use rocksdb::{Options, WriteBatch, DB};

use crate::error::{Result, StorageError};
use crate::rows::{CapsuleMeta, LatestRow, RecordBlockRow, TreeBlockRow};
use crate::schema::{self, ALL_COLUMN_FAMILIES};

/// A validated, ready-to-persist tree block produced by a commit.
#[derive(Clone, Debug)]
pub struct NewTreeBlock {
    pub name: Hash,
    pub block: HashBlock,
    pub parent: Option<Hash>,
    pub is_signed_root: bool,
}

/// A validated, ready-to-persist record produced by a commit.
#[derive(Clone, Debug)]
pub struct NewRecord {
    pub hash: Hash,
    pub ciphertext: Vec<u8>,
    pub seq: u64,
    pub leaf_parent: Hash,
}

/// Everything a successful `commit()` (§4.4.2) needs written, already
/// verified by the caller (`capsule`): `storage` persists, it never
/// checks a signature or rebuilds a tree.
pub struct CommitBatch {
    pub records: Vec<NewRecord>,
    pub tree_blocks: Vec<NewTreeBlock>,
    /// The previous commit's root, if this commit chained it in — its
    /// `treeblocks` row gains a parent link (§4.6 step 4).
    pub chained_previous_root: Option<Hash>,
    pub signed_root: SignedHash,
    pub new_latest_seq: u64,
}

#[derive(Clone)]
pub struct Store {
    db: Arc<DB>,
}

impl Store {
    /// Opening a RocksDB database is blocking disk I/O; run it on the
    /// blocking pool so it doesn't stall the worker thread it's called from.
    pub async fn open(path: &Path) -> Result<Self> {
        let path: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let mut opts = Options::default();
            opts.create_if_missing(true);
            opts.create_missing_column_families(true);
            tracing::info!(?path, "opening rocksdb");
            let db = DB::open_cf(&opts, &path, ALL_COLUMN_FAMILIES)?;
            Ok(Self { db: Arc::new(db) })
        })
        .await?
    }

    fn cf(&self, name: &str) -> &rocksdb::ColumnFamily {
        self.db.cf_handle(name).unwrap_or_else(|| panic!("missing column family {name}"))
    }

    pub fn create_capsule(&self, id: &DatacapsuleId, meta: CapsuleMeta) -> Result<()> {
        let cf = self.cf(schema::CF_CAPSULE_META);
        let key = schema::capsule_key(id);
        if self.db.get_cf(cf, &key)?.is_some() {
            return Err(StorageError::AlreadyExists(*id));
        }
        let value = bincode::serialize(&meta).expect("CapsuleMeta always serializes");
        self.db.put_cf(cf, key, value)?;
        Ok(())
    }

    pub fn meta(&self, id: &DatacapsuleId) -> Result<Option<CapsuleMeta>> {
        let cf = self.cf(schema::CF_CAPSULE_META);
        match self.db.get_cf(cf, schema::capsule_key(id))? {
            None => Ok(None),
            Some(bytes) => Ok(Some(
                bincode::deserialize(&bytes).map_err(|source| StorageError::Corrupt { cf: schema::CF_CAPSULE_META, source })?,
            )),
        }
    }

    /// Every Datacapsule id with a `capsule_meta` row, for rehydrating
    /// `server::Registry` at startup. `capsule_meta` is keyed by id alone,
    /// so a full scan visits each Datacapsule exactly once.
    pub fn list_capsule_ids(&self) -> Result<Vec<DatacapsuleId>> {
        let cf = self.cf(schema::CF_CAPSULE_META);
        let mut ids = Vec::new();
        for row in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (key, _) = row?;
            let hash = Hash::from_slice(&key).ok_or_else(|| StorageError::Corrupt {
                cf: schema::CF_CAPSULE_META,
                source: bincode::ErrorKind::Custom("malformed capsule_meta key".to_string()).into(),
            })?;
            ids.push(DatacapsuleId(hash));
        }
        Ok(ids)
    }

    pub fn latest(&self, id: &DatacapsuleId) -> Result<Option<LatestRow>> {
        let cf = self.cf(schema::CF_LATEST);
        match self.db.get_cf(cf, schema::capsule_key(id))? {
            None => Ok(None),
            Some(bytes) => Ok(Some(
                bincode::deserialize(&bytes).map_err(|source| StorageError::Corrupt { cf: schema::CF_LATEST, source })?,
            )),
        }
    }

    pub fn record(&self, id: &DatacapsuleId, hash: &Hash) -> Result<Option<Vec<u8>>> {
        let cf = self.cf(schema::CF_BINDATA);
        Ok(self.db.get_cf(cf, schema::hash_key(id, hash))?)
    }

    pub fn name_from_num(&self, id: &DatacapsuleId, seq: u64) -> Result<Option<Hash>> {
        let cf = self.cf(schema::CF_SEQBLOCKS);
        match self.db.get_cf(cf, schema::seq_forward_key(id, seq))? {
            None => Ok(None),
            Some(bytes) => Ok(Hash::from_slice(&bytes)),
        }
    }

    /// Records sharing a hash get one reverse row each (keyed by
    /// `hash || seq`); this answers with whichever sorts first, the same
    /// occurrence `record_block_row`'s prefix scan would pick.
    pub fn num_from_name(&self, id: &DatacapsuleId, hash: &Hash) -> Result<Option<u64>> {
        let cf = self.cf(schema::CF_SEQBLOCKS);
        let prefix = schema::seq_reverse_prefix(id, hash);
        for row in self.db.iterator_cf(cf, rocksdb::IteratorMode::From(&prefix, rocksdb::Direction::Forward)) {
            let (key, _) = row?;
            if !key.starts_with(&prefix) {
                break;
            }
            let seq_bytes = &key[prefix.len()..];
            let mut b = [0u8; 8];
            b.copy_from_slice(seq_bytes);
            return Ok(Some(u64::from_be_bytes(b)));
        }
        Ok(None)
    }

    fn tree_block_row(&self, id: &DatacapsuleId, name: &Hash) -> Result<Option<TreeBlockRow>> {
        let cf = self.cf(schema::CF_TREEBLOCKS);
        match self.db.get_cf(cf, schema::hash_key(id, name))? {
            None => Ok(None),
            Some(bytes) => Ok(Some(
                bincode::deserialize(&bytes).map_err(|source| StorageError::Corrupt { cf: schema::CF_TREEBLOCKS, source })?,
            )),
        }
    }

    /// Records sharing a hash each get their own `recordblocks` row (keyed
    /// by `hash || seq`); any one of them is a sound answer to
    /// `containing_block(hash)`, since the block it names genuinely does
    /// contain a leaf with this hash.
    fn record_block_row(&self, id: &DatacapsuleId, hash: &Hash) -> Result<Option<RecordBlockRow>> {
        let cf = self.cf(schema::CF_RECORDBLOCKS);
        let prefix = schema::record_prefix(id, hash);
        for row in self.db.iterator_cf(cf, rocksdb::IteratorMode::From(&prefix, rocksdb::Direction::Forward)) {
            let (key, bytes) = row?;
            if !key.starts_with(&prefix[..]) {
                break;
            }
            return Ok(Some(
                bincode::deserialize(&bytes).map_err(|source| StorageError::Corrupt { cf: schema::CF_RECORDBLOCKS, source })?,
            ));
        }
        Ok(None)
    }

    fn signature(&self, id: &DatacapsuleId, root: &Hash) -> Result<Option<primitives::Signature>> {
        let cf = self.cf(schema::CF_SIGBLOCKS);
        match self.db.get_cf(cf, schema::hash_key(id, root))? {
            None => Ok(None),
            Some(bytes) => Ok(Some(
                bincode::deserialize(&bytes).map_err(|source| StorageError::Corrupt { cf: schema::CF_SIGBLOCKS, source })?,
            )),
        }
    }

    /// Persists a validated commit in the order of §4.6: steps 1-6 batched
    /// atomically, `latest` updated last and separately, so a crash between
    /// the two leaves the batch's rows as inert, lazily collectible garbage.
    /// The actual RocksDB writes are blocking disk I/O, run on the blocking
    /// pool so a large commit doesn't stall other connections' I/O.
    pub async fn commit(&self, id: &DatacapsuleId, batch: CommitBatch) -> Result<()> {
        let store = self.clone();
        let id = *id;
        tokio::task::spawn_blocking(move || store.commit_blocking(&id, batch)).await?
    }

    fn commit_blocking(&self, id: &DatacapsuleId, batch: CommitBatch) -> Result<()> {
        let mut wb = WriteBatch::default();

        let bindata_cf = self.cf(schema::CF_BINDATA);
        let recordblocks_cf = self.cf(schema::CF_RECORDBLOCKS);
        let treeblocks_cf = self.cf(schema::CF_TREEBLOCKS);
        let sigblocks_cf = self.cf(schema::CF_SIGBLOCKS);
        let seqblocks_cf = self.cf(schema::CF_SEQBLOCKS);

        // 1. bindata
        for r in &batch.records {
            wb.put_cf(bindata_cf, schema::hash_key(id, &r.hash), &r.ciphertext);
        }

        // 2. recordblocks. Keyed by (hash, seq): two records in this commit
        // can share a hash and still need distinct rows, since they can sit
        // in different level-0 tree blocks (§8 scenario S6).
        for r in &batch.records {
            let row = RecordBlockRow { parent_tree_hash: r.leaf_parent, seq: r.seq };
            let bytes = bincode::serialize(&row).expect("RecordBlockRow always serializes");
            wb.put_cf(recordblocks_cf, schema::record_key(id, &r.hash, r.seq), bytes);
        }

        // 3. treeblocks (new interior nodes for this commit)
        for tb in &batch.tree_blocks {
            let row = TreeBlockRow { block: tb.block.clone(), parent: tb.parent, is_signed_root: tb.is_signed_root };
            let bytes = bincode::serialize(&row).expect("TreeBlockRow always serializes");
            wb.put_cf(treeblocks_cf, schema::hash_key(id, &tb.name), bytes);
        }

        // 4. parent link patch on the chained previous root, if any
        if let Some(prev_root) = batch.chained_previous_root {
            let mut row = self
                .tree_block_row(id, &prev_root)?
                .expect("chained_previous_root must already be a persisted treeblocks row");
            row.parent = Some(batch.signed_root.hash);
            let bytes = bincode::serialize(&row).expect("TreeBlockRow always serializes");
            wb.put_cf(treeblocks_cf, schema::hash_key(id, &prev_root), bytes);
        }

        // 5. sigblocks
        wb.put_cf(sigblocks_cf, schema::hash_key(id, &batch.signed_root.hash), bincode::serialize(&batch.signed_root.sig).expect("Signature always serializes"));

        // 6. seqblocks (both directions). The reverse row is keyed by
        // (hash, seq) for the same reason as recordblocks above: a shared
        // hash must not make one record's seq clobber another's.
        for r in &batch.records {
            wb.put_cf(seqblocks_cf, schema::seq_forward_key(id, r.seq), r.hash.as_bytes());
            wb.put_cf(seqblocks_cf, schema::seq_reverse_key(id, &r.hash, r.seq), r.seq.to_be_bytes());
        }

        self.db.write(wb)?;

        // 7. latest, committed separately and last
        let latest_cf = self.cf(schema::CF_LATEST);
        let latest_row = LatestRow { latest_seq: batch.new_latest_seq, latest_root: batch.signed_root.hash };
        self.db.put_cf(latest_cf, schema::capsule_key(id), bincode::serialize(&latest_row).expect("LatestRow always serializes"))?;

        Ok(())
    }

    pub fn view<'a>(&'a self, id: DatacapsuleId) -> CapsuleView<'a> {
        CapsuleView { store: self, id }
    }
}

/// A read-only, single-Datacapsule view over a `Store`, used to answer
/// `merkle::ProofSource` queries during proof assembly.
pub struct CapsuleView<'a> {
    store: &'a Store,
    id: DatacapsuleId,
}

impl<'a> merkle::ProofSource for CapsuleView<'a> {
    fn block(&self, name: &Hash) -> Option<HashBlock> {
        self.store.tree_block_row(&self.id, name).ok().flatten().map(|row| row.block)
    }

    fn containing_block(&self, t: &Hash) -> Option<Hash> {
        if let Some(row) = self.store.record_block_row(&self.id, t).ok().flatten() {
            return Some(row.parent_tree_hash);
        }
        self.store.tree_block_row(&self.id, t).ok().flatten().and_then(|row| row.parent)
    }

    fn signed_root(&self, name: &Hash) -> Option<SignedHash> {
        let row = self.store.tree_block_row(&self.id, name).ok().flatten()?;
        if !row.is_signed_root {
            return None;
        }
        let sig = self.store.signature(&self.id, name).ok().flatten()?;
        Some(SignedHash { hash: *name, sig })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use primitives::{PubKey, Signature};

    async fn open_temp() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).await.unwrap();
        (dir, store)
    }

    fn sample_meta() -> CapsuleMeta {
        CapsuleMeta {
            creator_pubkey: PubKey([1u8; 32]),
            creator_sig: Signature([0u8; 64]),
            writer_pubkey: PubKey([2u8; 32]),
            description: b"test".to_vec(),
        }
    }

    #[tokio::test]
    async fn create_then_fetch_meta() {
        let (_dir, store) = open_temp().await;
        let id = DatacapsuleId(Hash([9u8; 32]));
        store.create_capsule(&id, sample_meta()).unwrap();
        let meta = store.meta(&id).unwrap().unwrap();
        assert_eq!(meta.description, b"test");
    }

    #[tokio::test]
    async fn create_twice_fails() {
        let (_dir, store) = open_temp().await;
        let id = DatacapsuleId(Hash([9u8; 32]));
        store.create_capsule(&id, sample_meta()).unwrap();
        let err = store.create_capsule(&id, sample_meta()).unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn list_capsule_ids_finds_every_created_capsule() {
        let (_dir, store) = open_temp().await;
        let a = DatacapsuleId(Hash([1u8; 32]));
        let b = DatacapsuleId(Hash([2u8; 32]));
        store.create_capsule(&a, sample_meta()).unwrap();
        store.create_capsule(&b, sample_meta()).unwrap();
        let mut ids = store.list_capsule_ids().unwrap();
        ids.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn commit_single_record_then_round_trip_lookups() {
        let (_dir, store) = open_temp().await;
        let id = DatacapsuleId(Hash([7u8; 32]));
        store.create_capsule(&id, sample_meta()).unwrap();

        let leaves = vec![Hash([1u8; 32])];
        let built = merkle::build(&leaves, 2, None);
        let leaf_parent = built.levels[0].names[0];

        let batch = CommitBatch {
            records: vec![NewRecord { hash: leaves[0], ciphertext: b"ct".to_vec(), seq: 0, leaf_parent }],
            tree_blocks: built
                .levels
                .iter()
                .enumerate()
                .flat_map(|(lvl_idx, level)| {
                    let is_root = lvl_idx + 1 == built.levels.len();
                    level.blocks.iter().zip(level.names.iter()).map(move |(b, n)| NewTreeBlock {
                        name: *n,
                        block: b.clone(),
                        parent: None,
                        is_signed_root: is_root,
                    })
                })
                .collect(),
            chained_previous_root: None,
            signed_root: SignedHash { hash: built.root, sig: Signature([3u8; 64]) },
            new_latest_seq: 0,
        };
        store.commit(&id, batch).await.unwrap();

        assert_eq!(store.record(&id, &leaves[0]).unwrap().unwrap(), b"ct".to_vec());
        assert_eq!(store.name_from_num(&id, 0).unwrap().unwrap(), leaves[0]);
        assert_eq!(store.num_from_name(&id, &leaves[0]).unwrap().unwrap(), 0);
        assert_eq!(store.latest(&id).unwrap().unwrap().latest_root, built.root);

        let view = store.view(id);
        use merkle::ProofSource;
        assert!(view.signed_root(&built.root).is_some());
        assert_eq!(view.containing_block(&leaves[0]), Some(leaf_parent));
    }

    /// §8 scenario S6: a commit with two records sharing a content hash
    /// lands them in different level-0 blocks (fanout 2, three leaves), and
    /// both sequence numbers must still read back and resolve a parent.
    #[tokio::test]
    async fn commit_with_duplicate_hash_records_keeps_both_seqs_queryable() {
        let (_dir, store) = open_temp().await;
        let id = DatacapsuleId(Hash([8u8; 32]));
        store.create_capsule(&id, sample_meta()).unwrap();

        let dup = Hash([5u8; 32]);
        let other = Hash([6u8; 32]);
        let leaves = vec![dup, other, dup];
        let built = merkle::build(&leaves, 2, None);
        // 3 leaves, fanout 2: level0 = [{dup, other}, {dup, NULL}].
        assert_eq!(built.levels[0].blocks.len(), 2);
        let parent_seq0 = built.levels[0].names[0];
        let parent_seq2 = built.levels[0].names[1];
        assert_ne!(parent_seq0, parent_seq2, "the duplicate's two occurrences must sit in different blocks");

        let batch = CommitBatch {
            records: vec![
                NewRecord { hash: dup, ciphertext: b"dup".to_vec(), seq: 0, leaf_parent: parent_seq0 },
                NewRecord { hash: other, ciphertext: b"other".to_vec(), seq: 1, leaf_parent: parent_seq0 },
                NewRecord { hash: dup, ciphertext: b"dup".to_vec(), seq: 2, leaf_parent: parent_seq2 },
            ],
            tree_blocks: built
                .levels
                .iter()
                .enumerate()
                .flat_map(|(lvl_idx, level)| {
                    let is_root = lvl_idx + 1 == built.levels.len();
                    level.blocks.iter().zip(level.names.iter()).map(move |(b, n)| NewTreeBlock {
                        name: *n,
                        block: b.clone(),
                        parent: None,
                        is_signed_root: is_root,
                    })
                })
                .collect(),
            chained_previous_root: None,
            signed_root: SignedHash { hash: built.root, sig: Signature([3u8; 64]) },
            new_latest_seq: 2,
        };
        store.commit(&id, batch).await.unwrap();

        assert_eq!(store.name_from_num(&id, 0).unwrap().unwrap(), dup);
        assert_eq!(store.name_from_num(&id, 1).unwrap().unwrap(), other);
        assert_eq!(store.name_from_num(&id, 2).unwrap().unwrap(), dup);
        assert_eq!(store.record(&id, &dup).unwrap().unwrap(), b"dup".to_vec());

        let view = store.view(id);
        use merkle::ProofSource;
        // Either occurrence's parent is a sound anchor: both blocks genuinely
        // contain `dup` as a child and both chain to the signed root.
        let parent = view.containing_block(&dup).unwrap();
        assert!(parent == parent_seq0 || parent == parent_seq2);
        assert!(view.block(&parent).unwrap().contains(&dup));
        assert!(view.signed_root(&built.root).is_some());
    }
}
