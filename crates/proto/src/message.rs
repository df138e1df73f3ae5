//! The wire message vocabulary (§6): one self-describing envelope carries
//! every request and response across all four connection roles.

use primitives::{DatacapsuleId, Hash, PubKey, Role, Signature, SignedHash};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Init {
    pub role: Role,
    /// Present for every role but Creator, which mints a fresh id instead.
    pub datacapsule: Option<DatacapsuleId>,
}

/// The accept/reject the dispatcher owes every `Init` (§4.4): `ok` for
/// Creator, or for Writer/Reader/Subscriber against a Datacapsule that
/// exists; `ok: false` (closing the connection) otherwise.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct InitResponse {
    pub ok: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateRequest {
    /// Not named in spec.md's message table, but required to compute the
    /// Datacapsule id (`H(creator_pubkey || writer_pubkey || description)`,
    /// §3) and to verify `creator_sig` against anything.
    pub creator_pubkey: PubKey,
    pub writer_pubkey: PubKey,
    pub description: Vec<u8>,
    pub creator_sig: Signature,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CreateResponse {
    pub ok: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WriteRequest {
    pub encrypted_bytes: Vec<u8>,
    pub seq: u64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CommitRequest {
    pub client_root: Hash,
    pub client_signed_root: Signature,
    pub include_prev_root: bool,
}

/// An empty frame on failure (§7) is modeled as `Failed`, deliberately
/// coarse — it does not distinguish root mismatch from bad signature.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub enum CommitResponse {
    Ok(SignedHash),
    Failed,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ReadRequest {
    pub hash: Hash,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ReadResponse {
    Bytes(Vec<u8>),
    Absent,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ProveRequest {
    pub hash: Hash,
}

/// `ok` carries the proof stream the client must process to update its own
/// cache state in lockstep; `invalid` means `hash` is not part of this
/// Datacapsule at all (§4.4.3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ProveResponse {
    Ok(merkle::ProofStream),
    Invalid,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StartCacheRequest {
    pub hashes: Vec<Hash>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct GetLastNumRequest;

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct GetLastNumResponse {
    pub seq: Option<u64>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct NameFromNumRequest {
    pub seq: u64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct NameFromNumResponse {
    pub hash: Option<Hash>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct NumFromNameRequest {
    pub hash: Hash,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct NumFromNameResponse {
    pub seq: Option<u64>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct WaitAfterRequest {
    pub seq: u64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct WaitAfterResponse {
    pub new_seq: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Message {
    Init(Init),
    InitResponse(InitResponse),
    CreateRequest(CreateRequest),
    CreateResponse(CreateResponse),
    WriteRequest(WriteRequest),
    CommitRequest(CommitRequest),
    CommitResponse(CommitResponse),
    ReadRequest(ReadRequest),
    ReadResponse(ReadResponse),
    ProveRequest(ProveRequest),
    ProveResponse(ProveResponse),
    StartCacheRequest(StartCacheRequest),
    GetLastNumRequest(GetLastNumRequest),
    GetLastNumResponse(GetLastNumResponse),
    NameFromNumRequest(NameFromNumRequest),
    NameFromNumResponse(NameFromNumResponse),
    NumFromNameRequest(NumFromNameRequest),
    NumFromNameResponse(NumFromNameResponse),
    WaitAfterRequest(WaitAfterRequest),
    WaitAfterResponse(WaitAfterResponse),
}
