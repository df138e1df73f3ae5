//! `sign` / `verify` — RedDSA (RedPallas) over the Orchard spend-authorization
//! domain, already a dependency of the teacher workspace (§4.1).

use primitives::{PubKey, Signature as WireSignature, SIGNATURE_WIDTH};
use rand::rngs::OsRng;
use reddsa::orchard::SpendAuth;
use reddsa::{Signature as RedSignature, SigningKey, VerificationKey, VerificationKeyBytes};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("malformed verification key")]
    MalformedKey,
    #[error("signature verification failed")]
    BadSignature,
}

/// A Datacapsule creator or writer's keypair. Only the server-visible half
/// (`public`) ever crosses the wire; `signing` stays with the client.
pub struct Keypair {
    pub signing: SigningKey<SpendAuth>,
    pub public: PubKey,
}

impl Keypair {
    pub fn generate() -> Self {
        let signing = SigningKey::<SpendAuth>::new(OsRng);
        let vk = VerificationKey::from(&signing);
        let bytes: VerificationKeyBytes<SpendAuth> = vk.into();
        let public = PubKey(<[u8; 32]>::from(bytes));
        Self { signing, public }
    }

    pub fn sign(&self, bytes: &[u8]) -> WireSignature {
        let sig: RedSignature<SpendAuth> = self.signing.sign(OsRng, bytes);
        WireSignature(<[u8; SIGNATURE_WIDTH]>::from(sig))
    }
}

/// `verify(pubkey, bytes, signature) -> bool` (§4.1). Never panics on a
/// malformed key or signature — those are just verification failures.
pub fn verify(pubkey: &PubKey, bytes: &[u8], sig: &WireSignature) -> bool {
    verify_checked(pubkey, bytes, sig).is_ok()
}

pub fn verify_checked(
    pubkey: &PubKey,
    bytes: &[u8],
    sig: &WireSignature,
) -> Result<(), CryptoError> {
    let vk_bytes = VerificationKeyBytes::<SpendAuth>::from(pubkey.0);
    let vk = VerificationKey::try_from(vk_bytes).map_err(|_| CryptoError::MalformedKey)?;
    let signature = RedSignature::<SpendAuth>::from(sig.0);
    vk.verify(bytes, &signature)
        .map_err(|_| CryptoError::BadSignature)
}
