//! AES-256-GCM envelope: `nonce || ciphertext || tag`
//!
//! The nonce is random per encryption (12 bytes, never reused for a given
//! key) and travels with the ciphertext; the tag is appended by the `aead`
//! crate's `encrypt` call, not handled separately.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::kdf::KEY_LEN;

pub const NONCE_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("ciphertext too short to contain a nonce")]
    Truncated,
    #[error("decryption failed: wrong passphrase or corrupted data")]
    AuthenticationFailed,
    #[error("invalid key length")]
    InvalidKey,
}

/// Encrypts `plaintext` under `key`, returning `nonce || ciphertext || tag`.
///
/// # Errors
/// Returns [`EnvelopeError::InvalidKey`] if `key` is not exactly
/// [`KEY_LEN`] bytes (never happens when `key` comes from
/// [`crate::kdf::derive_key`]).
pub fn seal(key: &Zeroizing<[u8; KEY_LEN]>, plaintext: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    let cipher = Aes256Gcm::new_from_slice(key.as_slice()).map_err(|_| EnvelopeError::InvalidKey)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| EnvelopeError::AuthenticationFailed)?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypts an envelope produced by [`seal`].
///
/// # Errors
/// Returns [`EnvelopeError::Truncated`] if `data` is shorter than a nonce,
/// or [`EnvelopeError::AuthenticationFailed`] if the tag does not verify
/// (wrong key or corrupted/tampered ciphertext).
pub fn open(key: &Zeroizing<[u8; KEY_LEN]>, data: &[u8]) -> Result<Zeroizing<Vec<u8>>, EnvelopeError> {
    if data.len() < NONCE_LEN {
        return Err(EnvelopeError::Truncated);
    }
    let cipher = Aes256Gcm::new_from_slice(key.as_slice()).map_err(|_| EnvelopeError::InvalidKey)?;

    let (nonce_bytes, ciphertext) = data.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);

    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| EnvelopeError::AuthenticationFailed)?;

    Ok(Zeroizing::new(plaintext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kdf::{derive_key, generate_salt};

    #[test]
    fn round_trips_plaintext() {
        let salt = generate_salt();
        let key = derive_key(b"passphrase", &salt).unwrap();
        let sealed = seal(&key, b"secret bytes").unwrap();
        let opened = open(&key, &sealed).unwrap();
        assert_eq!(&*opened, b"secret bytes");
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let salt = generate_salt();
        let key_a = derive_key(b"passphrase-a", &salt).unwrap();
        let key_b = derive_key(b"passphrase-b", &salt).unwrap();
        let sealed = seal(&key_a, b"secret bytes").unwrap();
        assert!(matches!(open(&key_b, &sealed), Err(EnvelopeError::AuthenticationFailed)));
    }

    #[test]
    fn truncated_data_is_rejected() {
        let salt = generate_salt();
        let key = derive_key(b"passphrase", &salt).unwrap();
        assert!(matches!(open(&key, &[0u8; 4]), Err(EnvelopeError::Truncated)));
    }

    #[test]
    fn tampered_ciphertext_fails_authentication() {
        let salt = generate_salt();
        let key = derive_key(b"passphrase", &salt).unwrap();
        let mut sealed = seal(&key, b"secret bytes").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0xFF;
        assert!(matches!(open(&key, &sealed), Err(EnvelopeError::AuthenticationFailed)));
    }
}
