//! Core data-model types shared by every crate in the workspace: `Hash`,
//! `SignedHash`, `HashBlock`, `Record`, and the Datacapsule identifier.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Width in bytes of every hash in the system. Fixed at compile time; see
/// `SPEC_FULL.md` §10 for why this is not negotiated at connection init.
pub const HASH_WIDTH: usize = 32;

/// Width in bytes of a RedDSA (RedPallas) signature.
pub const SIGNATURE_WIDTH: usize = 64;

/// Width in bytes of a RedDSA verification key.
pub const PUBKEY_WIDTH: usize = 32;

mod fixed_bytes {
    //! `serde` support for fixed-size byte arrays, following the visitor
    //! pattern the teacher workspace uses for `RedPallasSig`.
    use serde::de::{Error, SeqAccess, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;
    use std::marker::PhantomData;

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        d: D,
    ) -> Result<[u8; N], D::Error> {
        struct ArrVisitor<const N: usize>(PhantomData<[u8; N]>);
        impl<'de, const N: usize> Visitor<'de> for ArrVisitor<N> {
            type Value = [u8; N];
            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "a {N}-byte array")
            }
            fn visit_bytes<E: Error>(self, v: &[u8]) -> Result<Self::Value, E> {
                if v.len() != N {
                    return Err(E::invalid_length(v.len(), &self));
                }
                let mut out = [0u8; N];
                out.copy_from_slice(v);
                Ok(out)
            }
            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut out = [0u8; N];
                for slot in out.iter_mut() {
                    *slot = match seq.next_element::<u8>()? {
                        Some(b) => b,
                        None => return Err(serde::de::Error::invalid_length(N, &self)),
                    };
                }
                Ok(out)
            }
        }
        d.deserialize_bytes(ArrVisitor::<N>(PhantomData))
    }
}

/// A fixed-width opaque hash. The all-zero value is the Null Hash (§3).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Hash(pub [u8; HASH_WIDTH]);

impl Hash {
    pub const NULL: Hash = Hash([0u8; HASH_WIDTH]);

    pub fn is_null(&self) -> bool {
        self.0 == [0u8; HASH_WIDTH]
    }

    pub fn as_bytes(&self) -> &[u8; HASH_WIDTH] {
        &self.0
    }

    pub fn from_slice(b: &[u8]) -> Option<Self> {
        if b.len() != HASH_WIDTH {
            return None;
        }
        let mut out = [0u8; HASH_WIDTH];
        out.copy_from_slice(b);
        Some(Hash(out))
    }

    /// Low bits used by the hash cache's direct-mapped index (§4.3).
    pub fn low_bits(&self) -> u64 {
        let mut b = [0u8; 8];
        b.copy_from_slice(&self.0[..8]);
        u64::from_le_bytes(b)
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", hex::encode(self.0))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl Serialize for Hash {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        fixed_bytes::serialize(&self.0, s)
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        fixed_bytes::deserialize::<D, HASH_WIDTH>(d).map(Hash)
    }
}

/// A RedDSA signature over the bytes of a `Hash`.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct Signature(pub [u8; SIGNATURE_WIDTH]);

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature(..)")
    }
}

impl Serialize for Signature {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        fixed_bytes::serialize(&self.0, s)
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        fixed_bytes::deserialize::<D, SIGNATURE_WIDTH>(d).map(Signature)
    }
}

/// A RedDSA verification key identifying a Datacapsule's creator or writer.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct PubKey(pub [u8; PUBKEY_WIDTH]);

impl fmt::Debug for PubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PubKey({})", hex::encode(self.0))
    }
}

impl Serialize for PubKey {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        fixed_bytes::serialize(&self.0, s)
    }
}

impl<'de> Deserialize<'de> for PubKey {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        fixed_bytes::deserialize::<D, PUBKEY_WIDTH>(d).map(PubKey)
    }
}

/// A (hash, signature) pair verifiable under a known `PubKey` (§3).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct SignedHash {
    pub hash: Hash,
    pub sig: Signature,
}

/// An interior Merkle node: an ordered tuple of child hashes. A child slot
/// may be the Null Hash. `name()` is `H(concat(children))`, computed by the
/// caller via the `crypto` crate — kept out of `primitives` to avoid a
/// dependency cycle on the hash façade.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct HashBlock {
    pub children: Vec<Hash>,
}

impl HashBlock {
    pub fn new(children: Vec<Hash>) -> Self {
        Self { children }
    }

    /// Canonical byte encoding fed to `H()` to derive this block's name:
    /// plain concatenation of children, no length prefix or domain tag —
    /// the spec pins `name(b) = H(concat(children(b)))` exactly (§3, §8).
    pub fn encoding(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.children.len() * HASH_WIDTH);
        for c in &self.children {
            buf.extend_from_slice(&c.0);
        }
        buf
    }

    pub fn contains(&self, h: &Hash) -> bool {
        self.children.iter().any(|c| c == h)
    }
}

/// An opaque encrypted record plus its client-chosen sequence number.
/// The server never interprets `ciphertext`.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Record {
    pub seq: u64,
    pub ciphertext: Vec<u8>,
}

/// Identifies a Datacapsule: `H(creator_pubkey || writer_pubkey || description)`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatacapsuleId(pub Hash);

impl fmt::Display for DatacapsuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The four connection roles a client selects at Init (§4.4).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Role {
    Creator,
    Writer,
    Reader,
    Subscriber,
}
