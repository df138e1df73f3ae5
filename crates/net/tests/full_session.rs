//! End-to-end exercise of the dispatcher across all four roles (§8
//! scenario S1: create, write, commit, read, prove).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use net::directory::CapsuleDirectory;
use primitives::{DatacapsuleId, Role};
use proto::{read_frame, write_frame, CommitResponse, CreateResponse, Init, Message, ProveResponse, ReadResponse};

struct TestDirectory {
    store: storage::Store,
    server_keypair: crypto::Keypair,
    capsules: RwLock<HashMap<DatacapsuleId, Arc<capsule::CapsuleState>>>,
}

impl CapsuleDirectory for TestDirectory {
    fn get(&self, id: &DatacapsuleId) -> Option<Arc<capsule::CapsuleState>> {
        self.capsules.read().unwrap().get(id).cloned()
    }

    fn create(&self, id: DatacapsuleId, meta: storage::CapsuleMeta) -> Result<Arc<capsule::CapsuleState>, storage::StorageError> {
        self.store.create_capsule(&id, meta.clone())?;
        let state = Arc::new(capsule::CapsuleState::new(id, meta.creator_pubkey, meta.creator_sig, meta.writer_pubkey, meta.description));
        self.capsules.write().unwrap().insert(id, state.clone());
        Ok(state)
    }

    fn store(&self) -> &storage::Store {
        &self.store
    }

    fn server_keypair(&self) -> &crypto::Keypair {
        &self.server_keypair
    }

    fn merkle_fanout(&self) -> usize {
        2
    }

    fn sig_avoid_max_extra_hashes(&self) -> usize {
        4
    }

    fn hash_cache_capacity(&self) -> usize {
        1024
    }
}

#[tokio::test]
async fn create_write_commit_read_prove_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let store = storage::Store::open(dir.path()).await.unwrap();
    let directory: Arc<dyn CapsuleDirectory> = Arc::new(TestDirectory {
        store,
        server_keypair: crypto::Keypair::generate(),
        capsules: RwLock::new(HashMap::new()),
    });

    let creator = crypto::Keypair::generate();
    let writer = crypto::Keypair::generate();
    let description = b"dataset".to_vec();
    let id = crypto::datacapsule_id(&creator.public, &writer.public, &description);
    let creator_sig = creator.sign(id.0.as_bytes());

    let (mut client, server) = tokio::io::duplex(64 * 1024);
    let d = directory.clone();
    let server_task = tokio::spawn(async move { net::dispatch(server, d).await });

    write_frame(&mut client, &Message::Init(Init { role: Role::Creator, datacapsule: None })).await.unwrap();
    let init_resp = read_frame(&mut client).await.unwrap();
    assert!(matches!(init_resp, Message::InitResponse(r) if r.ok));

    write_frame(
        &mut client,
        &Message::CreateRequest(proto::CreateRequest {
            creator_pubkey: creator.public,
            writer_pubkey: writer.public,
            description: description.clone(),
            creator_sig,
        }),
    )
    .await
    .unwrap();
    let resp = read_frame(&mut client).await.unwrap();
    assert!(matches!(resp, Message::CreateResponse(CreateResponse { ok: true })));
    server_task.await.unwrap().unwrap();

    let (mut client, server) = tokio::io::duplex(64 * 1024);
    let d = directory.clone();
    let server_task = tokio::spawn(async move { net::dispatch(server, d).await });

    write_frame(&mut client, &Message::Init(Init { role: Role::Writer, datacapsule: Some(id) })).await.unwrap();
    let init_resp = read_frame(&mut client).await.unwrap();
    assert!(matches!(init_resp, Message::InitResponse(r) if r.ok));

    let record_bytes = b"encrypted payload".to_vec();
    write_frame(&mut client, &Message::WriteRequest(proto::WriteRequest { encrypted_bytes: record_bytes.clone(), seq: 0 })).await.unwrap();

    let record_hash = crypto::h(&record_bytes);
    let built = merkle::build(&[record_hash], 2, None);
    let signed_root = writer.sign(built.root.as_bytes());
    write_frame(
        &mut client,
        &Message::CommitRequest(proto::CommitRequest { client_root: built.root, client_signed_root: signed_root, include_prev_root: false }),
    )
    .await
    .unwrap();
    let resp = read_frame(&mut client).await.unwrap();
    assert!(matches!(resp, Message::CommitResponse(CommitResponse::Ok(_))));
    drop(client);
    server_task.await.unwrap().unwrap();

    let (mut client, server) = tokio::io::duplex(64 * 1024);
    let d = directory.clone();
    let server_task = tokio::spawn(async move { net::dispatch(server, d).await });

    write_frame(&mut client, &Message::Init(Init { role: Role::Reader, datacapsule: Some(id) })).await.unwrap();
    let init_resp = read_frame(&mut client).await.unwrap();
    assert!(matches!(init_resp, Message::InitResponse(r) if r.ok));

    write_frame(&mut client, &Message::ReadRequest(proto::ReadRequest { hash: record_hash })).await.unwrap();
    let resp = read_frame(&mut client).await.unwrap();
    assert!(matches!(resp, Message::ReadResponse(ReadResponse::Bytes(b)) if b == record_bytes));

    write_frame(&mut client, &Message::ProveRequest(proto::ProveRequest { hash: record_hash })).await.unwrap();
    let resp = read_frame(&mut client).await.unwrap();
    assert!(matches!(resp, Message::ProveResponse(ProveResponse::Ok(_))));
    drop(client);
    server_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn second_writer_init_is_refused_while_first_holds_the_lock() {
    let dir = tempfile::tempdir().unwrap();
    let store = storage::Store::open(dir.path()).await.unwrap();
    let directory: Arc<dyn CapsuleDirectory> = Arc::new(TestDirectory {
        store,
        server_keypair: crypto::Keypair::generate(),
        capsules: RwLock::new(HashMap::new()),
    });

    let creator = crypto::Keypair::generate();
    let writer = crypto::Keypair::generate();
    let description = b"dataset".to_vec();
    let id = crypto::datacapsule_id(&creator.public, &writer.public, &description);
    directory
        .create(
            id,
            storage::CapsuleMeta {
                creator_pubkey: creator.public,
                creator_sig: creator.sign(id.0.as_bytes()),
                writer_pubkey: writer.public,
                description,
            },
        )
        .unwrap();

    let (mut first_client, first_server) = tokio::io::duplex(64 * 1024);
    let d = directory.clone();
    let first_task = tokio::spawn(async move { net::dispatch(first_server, d).await });
    write_frame(&mut first_client, &Message::Init(Init { role: Role::Writer, datacapsule: Some(id) })).await.unwrap();
    let resp = read_frame(&mut first_client).await.unwrap();
    assert!(matches!(resp, Message::InitResponse(r) if r.ok));

    let (mut second_client, second_server) = tokio::io::duplex(64 * 1024);
    let d = directory.clone();
    let second_task = tokio::spawn(async move { net::dispatch(second_server, d).await });
    write_frame(&mut second_client, &Message::Init(Init { role: Role::Writer, datacapsule: Some(id) })).await.unwrap();
    let resp = read_frame(&mut second_client).await.unwrap();
    assert!(matches!(resp, Message::InitResponse(r) if !r.ok));
    drop(second_client);
    second_task.await.unwrap().unwrap();

    drop(first_client);
    first_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn rejected_commit_clears_uncommitted_so_the_next_commit_only_contains_later_writes() {
    // §8 scenario S4: a commit with a deliberately wrong client_root fails,
    // and the writer's uncommitted set is cleared rather than retried.
    let dir = tempfile::tempdir().unwrap();
    let store = storage::Store::open(dir.path()).await.unwrap();
    let directory: Arc<dyn CapsuleDirectory> = Arc::new(TestDirectory {
        store,
        server_keypair: crypto::Keypair::generate(),
        capsules: RwLock::new(HashMap::new()),
    });

    let creator = crypto::Keypair::generate();
    let writer = crypto::Keypair::generate();
    let description = b"dataset".to_vec();
    let id = crypto::datacapsule_id(&creator.public, &writer.public, &description);
    directory
        .create(
            id,
            storage::CapsuleMeta {
                creator_pubkey: creator.public,
                creator_sig: creator.sign(id.0.as_bytes()),
                writer_pubkey: writer.public,
                description,
            },
        )
        .unwrap();

    let (mut client, server) = tokio::io::duplex(64 * 1024);
    let d = directory.clone();
    let server_task = tokio::spawn(async move { net::dispatch(server, d).await });

    write_frame(&mut client, &Message::Init(Init { role: Role::Writer, datacapsule: Some(id) })).await.unwrap();
    let init_resp = read_frame(&mut client).await.unwrap();
    assert!(matches!(init_resp, Message::InitResponse(r) if r.ok));

    let r1 = b"r1".to_vec();
    let r2 = b"r2".to_vec();
    write_frame(&mut client, &Message::WriteRequest(proto::WriteRequest { encrypted_bytes: r1.clone(), seq: 0 })).await.unwrap();
    write_frame(&mut client, &Message::WriteRequest(proto::WriteRequest { encrypted_bytes: r2.clone(), seq: 1 })).await.unwrap();

    // Wrong root: the writer claims a single-leaf tree instead of the
    // actual two-leaf one.
    let bogus_root = merkle::build(&[crypto::h(&r1)], 2, None).root;
    let bogus_sig = writer.sign(bogus_root.as_bytes());
    write_frame(
        &mut client,
        &Message::CommitRequest(proto::CommitRequest { client_root: bogus_root, client_signed_root: bogus_sig, include_prev_root: false }),
    )
    .await
    .unwrap();
    let resp = read_frame(&mut client).await.unwrap();
    assert!(matches!(resp, Message::CommitResponse(CommitResponse::Failed)));

    // Only r3 follows: if U had not been cleared, this commit's root would
    // have to account for r1 and r2 too and this root would again mismatch.
    let r3 = b"r3".to_vec();
    write_frame(&mut client, &Message::WriteRequest(proto::WriteRequest { encrypted_bytes: r3.clone(), seq: 0 })).await.unwrap();
    let built = merkle::build(&[crypto::h(&r3)], 2, None);
    let sig = writer.sign(built.root.as_bytes());
    write_frame(
        &mut client,
        &Message::CommitRequest(proto::CommitRequest { client_root: built.root, client_signed_root: sig, include_prev_root: false }),
    )
    .await
    .unwrap();
    let resp = read_frame(&mut client).await.unwrap();
    assert!(matches!(resp, Message::CommitResponse(CommitResponse::Ok(_))));

    drop(client);
    server_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn subscriber_disconnect_mid_wait_releases_the_waiter_with_no_response() {
    // §8 scenario S5, second run: disconnecting while a waitAfter is
    // outstanding must end the connection immediately, not hang until the
    // next commit (or forever, if none ever comes).
    let dir = tempfile::tempdir().unwrap();
    let store = storage::Store::open(dir.path()).await.unwrap();
    let directory: Arc<dyn CapsuleDirectory> = Arc::new(TestDirectory {
        store,
        server_keypair: crypto::Keypair::generate(),
        capsules: RwLock::new(HashMap::new()),
    });

    let creator = crypto::Keypair::generate();
    let writer = crypto::Keypair::generate();
    let description = b"dataset".to_vec();
    let id = crypto::datacapsule_id(&creator.public, &writer.public, &description);
    directory
        .create(
            id,
            storage::CapsuleMeta {
                creator_pubkey: creator.public,
                creator_sig: creator.sign(id.0.as_bytes()),
                writer_pubkey: writer.public,
                description,
            },
        )
        .unwrap();

    let (mut client, server) = tokio::io::duplex(64 * 1024);
    let d = directory.clone();
    let server_task = tokio::spawn(async move { net::dispatch(server, d).await });

    write_frame(&mut client, &Message::Init(Init { role: Role::Subscriber, datacapsule: Some(id) })).await.unwrap();
    let init_resp = read_frame(&mut client).await.unwrap();
    assert!(matches!(init_resp, Message::InitResponse(r) if r.ok));

    // Nothing has been committed, so this would otherwise suspend forever.
    write_frame(&mut client, &Message::WaitAfterRequest(proto::WaitAfterRequest { seq: 0 })).await.unwrap();
    tokio::task::yield_now().await;
    drop(client);

    // The dispatcher must notice the close and return instead of leaking
    // the task and its watch::Receiver for the server's lifetime.
    tokio::time::timeout(std::time::Duration::from_secs(5), server_task).await.unwrap().unwrap().unwrap();
}
