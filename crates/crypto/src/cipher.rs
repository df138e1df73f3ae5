//! `enc` / `dec` — symmetric record-content encryption. Client-side only;
//! the server never calls this module, it only moves the resulting
//! ciphertext bytes around (§1, §4.1).

use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use thiserror::Error;

pub const KEY_WIDTH: usize = 32;
const NONCE_WIDTH: usize = 24;

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("ciphertext shorter than the nonce prefix")]
    Truncated,
    #[error("decryption failed (wrong key or tampered ciphertext)")]
    BadCiphertext,
}

/// Encrypts `plaintext` under `key`, returning `nonce || ciphertext`. The
/// nonce is random per call so repeated `enc()` of identical bytes produces
/// distinct ciphertext — a cooperative client relies on a prepended nonce
/// for the same reason it avoids server-side deduplication (§1 Non-goals).
pub fn enc(key: &[u8; KEY_WIDTH], plaintext: &[u8]) -> Vec<u8> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
    let mut out = nonce.to_vec();
    let ct = cipher
        .encrypt(&nonce, plaintext)
        .expect("XChaCha20Poly1305 encryption is infallible for well-formed input");
    out.extend_from_slice(&ct);
    out
}

pub fn dec(key: &[u8; KEY_WIDTH], ciphertext: &[u8]) -> Result<Vec<u8>, CipherError> {
    if ciphertext.len() < NONCE_WIDTH {
        return Err(CipherError::Truncated);
    }
    let (nonce_bytes, ct) = ciphertext.split_at(NONCE_WIDTH);
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    let nonce = XNonce::from_slice(nonce_bytes);
    cipher
        .decrypt(nonce, ct)
        .map_err(|_| CipherError::BadCiphertext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enc_dec_roundtrip() {
        let key = [5u8; KEY_WIDTH];
        let plaintext = b"a private record payload";
        let ciphertext = enc(&key, plaintext);
        let recovered = dec(&key, &ciphertext).unwrap();
        assert_eq!(recovered, plaintext);
    }

    #[test]
    fn repeated_encryption_is_not_deterministic() {
        let key = [1u8; KEY_WIDTH];
        let a = enc(&key, b"same bytes");
        let b = enc(&key, b"same bytes");
        assert_ne!(a, b, "random nonce should make ciphertexts differ");
    }

    #[test]
    fn wrong_key_fails_to_decrypt() {
        let ciphertext = enc(&[1u8; KEY_WIDTH], b"secret");
        assert!(dec(&[2u8; KEY_WIDTH], &ciphertext).is_err());
    }
}
