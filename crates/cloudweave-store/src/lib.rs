//! Encrypted SQLite metadata store for cloudweave
//!
//! Persists the normalized logical-file/replica/fragment/folder/account
//! model behind [`cloudweave_core::ports::MetadataStore`]. The database
//! itself lives plaintext only in a private tempfile; on disk it is an
//! AES-256-GCM envelope managed by [`EncryptedStore`].

pub mod error;
pub mod pool;
pub mod repository;

pub use error::StoreError;
pub use pool::{DatabasePool, EncryptedStore};
pub use repository::SqliteMetadataStore;
