//! Encryption at rest for cloudweave's config and metadata store
//!
//! Two layers: [`kdf`] turns a user passphrase into a key via Argon2id, and
//! [`envelope`] wraps bytes in AES-256-GCM. [`vault`] ties them together as
//! a file-level encrypt/decrypt helper used both by the secrets config
//! loader and by `cloudweave-store`'s at-rest encryption of `metadata.db`.

pub mod envelope;
pub mod kdf;
pub mod vault;

pub use envelope::EnvelopeError;
pub use kdf::{derive_key, generate_salt, KEY_LEN, SALT_LEN};
pub use vault::Vault;
