//! Argon2id key derivation with a persisted salt
//!
//! The salt lives alongside the encrypted file it protects (`<file>.salt`,
//! mode 0600 on unix) rather than being baked into the binary, so two
//! installs never derive the same key from the same passphrase.

use argon2::Argon2;
use rand::RngCore;
use zeroize::Zeroizing;

pub const SALT_LEN: usize = 32;
pub const KEY_LEN: usize = 32;

/// Argon2id parameters: 64 MiB memory, 4 lanes, 1 pass, 32-byte output.
///
/// One pass over 64 MiB is deliberately memory-hard rather than time-hard —
/// this KDF runs once per CLI invocation, not per request, so a few hundred
/// milliseconds is an acceptable floor for making offline brute force
/// expensive.
fn params() -> argon2::Params {
    argon2::Params::new(64 * 1024, 1, 4, Some(KEY_LEN))
        .expect("static Argon2id parameters are always valid")
}

/// Generates a fresh random salt.
#[must_use]
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Derives a 256-bit key from `passphrase` and `salt` via Argon2id.
///
/// # Errors
/// Returns an error if Argon2 rejects the input (e.g. an empty passphrase
/// combined with malformed parameters — not expected in practice with the
/// fixed [`params`] above).
pub fn derive_key(passphrase: &[u8], salt: &[u8; SALT_LEN]) -> anyhow::Result<Zeroizing<[u8; KEY_LEN]>> {
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params());
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(passphrase, salt, key.as_mut())
        .map_err(|e| anyhow::anyhow!("key derivation failed: {e}"))?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_key_is_deterministic_for_same_salt() {
        let salt = generate_salt();
        let a = derive_key(b"hunter2", &salt).unwrap();
        let b = derive_key(b"hunter2", &salt).unwrap();
        assert_eq!(*a, *b);
    }

    #[test]
    fn different_salts_derive_different_keys() {
        let salt_a = generate_salt();
        let salt_b = generate_salt();
        let a = derive_key(b"hunter2", &salt_a).unwrap();
        let b = derive_key(b"hunter2", &salt_b).unwrap();
        assert_ne!(*a, *b);
    }

    #[test]
    fn different_passphrases_derive_different_keys() {
        let salt = generate_salt();
        let a = derive_key(b"hunter2", &salt).unwrap();
        let b = derive_key(b"hunter3", &salt).unwrap();
        assert_ne!(*a, *b);
    }
}
