//! File-level encrypt/decrypt helpers shared by the secrets config loader
//! and the metadata store's at-rest encryption wrapper.

use std::fs;
use std::path::{Path, PathBuf};

use zeroize::Zeroizing;

use crate::envelope::{self, EnvelopeError};
use crate::kdf::{self, KEY_LEN, SALT_LEN};

/// Derives and caches the key for one encrypted file, keyed off a salt
/// persisted next to it at `<path>.salt`.
pub struct Vault {
    key: Zeroizing<[u8; KEY_LEN]>,
}

impl Vault {
    /// Opens (or, if none exists yet, creates) the salt file for `path` and
    /// derives the key from `passphrase`.
    ///
    /// # Errors
    /// Propagates filesystem and Argon2 failures.
    pub fn open(path: &Path, passphrase: &[u8]) -> anyhow::Result<Self> {
        let salt_path = salt_path_for(path);
        let salt = if salt_path.exists() {
            read_salt(&salt_path)?
        } else {
            let salt = kdf::generate_salt();
            write_salt(&salt_path, &salt)?;
            salt
        };
        let key = kdf::derive_key(passphrase, &salt)?;
        Ok(Self { key })
    }

    /// Reads and decrypts `path` in full.
    ///
    /// # Errors
    /// Returns an error if the file is missing, truncated, or fails
    /// authentication (wrong passphrase or tampered contents).
    pub fn decrypt_file(&self, path: &Path) -> anyhow::Result<Zeroizing<Vec<u8>>> {
        let data = fs::read(path)?;
        envelope::open(&self.key, &data).map_err(anyhow::Error::from)
    }

    /// Encrypts `plaintext` and writes it to `path`, replacing any existing
    /// contents. Sets mode 0600 on unix.
    ///
    /// # Errors
    /// Propagates encryption and filesystem failures.
    pub fn encrypt_file(&self, path: &Path, plaintext: &[u8]) -> anyhow::Result<()> {
        let sealed = envelope::seal(&self.key, plaintext)?;
        fs::write(path, sealed)?;
        set_owner_only_permissions(path)?;
        Ok(())
    }
}

impl From<EnvelopeError> for anyhow::Error {
    fn from(e: EnvelopeError) -> Self {
        anyhow::anyhow!(e)
    }
}

fn salt_path_for(path: &Path) -> PathBuf {
    let mut os_string = path.as_os_str().to_owned();
    os_string.push(".salt");
    PathBuf::from(os_string)
}

fn read_salt(path: &Path) -> anyhow::Result<[u8; SALT_LEN]> {
    let bytes = fs::read(path)?;
    let array: [u8; SALT_LEN] = bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("salt file {} has unexpected length", path.display()))?;
    Ok(array)
}

fn write_salt(path: &Path, salt: &[u8; SALT_LEN]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, salt)?;
    set_owner_only_permissions(path)?;
    Ok(())
}

#[cfg(unix)]
fn set_owner_only_permissions(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_owner_only_permissions(_path: &Path) -> anyhow::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trips_through_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("secret.enc");

        let vault = Vault::open(&path, b"passphrase").unwrap();
        vault.encrypt_file(&path, b"hello vault").unwrap();

        let reopened = Vault::open(&path, b"passphrase").unwrap();
        let plaintext = reopened.decrypt_file(&path).unwrap();
        assert_eq!(&*plaintext, b"hello vault");
    }

    #[test]
    fn wrong_passphrase_fails_to_decrypt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("secret.enc");

        let vault = Vault::open(&path, b"correct").unwrap();
        vault.encrypt_file(&path, b"hello vault").unwrap();

        let wrong = Vault::open(&path, b"incorrect").unwrap();
        assert!(wrong.decrypt_file(&path).is_err());
    }

    #[test]
    fn salt_persists_across_opens() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("secret.enc");

        let first = Vault::open(&path, b"passphrase").unwrap();
        first.encrypt_file(&path, b"a").unwrap();
        drop(first);

        let second = Vault::open(&path, b"passphrase").unwrap();
        assert_eq!(&*second.decrypt_file(&path).unwrap(), b"a");
    }
}
