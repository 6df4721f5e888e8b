//! Database connection pool management
//!
//! Provides a wrapper around SQLx's `SqlitePool` with:
//! - WAL journal mode for concurrent reads
//! - Automatic schema migration on first connection
//! - Whole-file encryption at rest: the on-disk file is an AES-256-GCM
//!   envelope; at open time it is decrypted into a private tempfile and
//!   operated on as a normal SQLite database, then re-sealed back to the
//!   real path on [`EncryptedStore::seal`]
//! - In-memory mode for testing (no encryption)

use std::path::{Path, PathBuf};

use cloudweave_crypto::Vault;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tempfile::NamedTempFile;

use crate::StoreError;

/// Manages a pool of SQLite connections for cloudweave's metadata store
///
/// The pool is configured with:
/// - WAL journal mode for concurrent read access
/// - 5 max connections for file-based databases
/// - 1 connection for in-memory databases (required for data persistence)
/// - 5-second busy timeout to handle write contention
pub struct DatabasePool {
    pool: SqlitePool,
}

impl DatabasePool {
    /// Connects to the (already plaintext) SQLite file at `db_path` and
    /// runs migrations. Used internally by [`EncryptedStore`] against its
    /// decrypted tempfile, and directly by tests against a throwaway path.
    pub async fn new(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::ConnectionFailed(format!(
                    "failed to create database directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| {
                StoreError::ConnectionFailed(format!(
                    "failed to connect to database at {}: {e}",
                    db_path.display()
                ))
            })?;

        Self::run_migrations(&pool).await?;

        tracing::info!(path = %db_path.display(), "database pool initialized");

        Ok(Self { pool })
    }

    /// Creates an in-memory database pool for testing.
    ///
    /// Uses a single connection to ensure data persistence across queries
    /// (SQLite in-memory databases are per-connection).
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| StoreError::ConnectionFailed(format!("failed to create in-memory database: {e}")))?;

        sqlx::raw_sql("PRAGMA foreign_keys = ON;")
            .execute(&pool)
            .await
            .map_err(|e| StoreError::MigrationFailed(format!("failed to enable foreign keys: {e}")))?;

        Self::run_migrations(&pool).await?;

        tracing::debug!("in-memory database pool initialized");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<(), StoreError> {
        let migration_sql = include_str!("migrations/20260203_initial.sql");
        sqlx::raw_sql(migration_sql)
            .execute(pool)
            .await
            .map_err(|e| StoreError::MigrationFailed(format!("failed to run initial migration: {e}")))?;

        tracing::debug!("database migrations completed");
        Ok(())
    }
}

/// The encrypted-at-rest metadata store
///
/// Holds the real encrypted path, a [`Vault`] bound to it, and the
/// [`NamedTempFile`] currently backing the live `SqlitePool`. The tempfile
/// is created with mode 0600 and is removed on drop.
pub struct EncryptedStore {
    real_path: PathBuf,
    vault: Vault,
    _plaintext_file: NamedTempFile,
    db: DatabasePool,
}

impl EncryptedStore {
    /// Opens `real_path`, decrypting it into a private tempfile if it
    /// exists, or creating a fresh plaintext database if it does not.
    ///
    /// # Errors
    /// Returns [`StoreError::Encryption`] if `passphrase` is wrong (fails
    /// AEAD authentication) or the file is corrupted.
    pub async fn open(real_path: &Path, passphrase: &[u8]) -> Result<Self, StoreError> {
        let vault = Vault::open(real_path, passphrase).map_err(StoreError::Encryption)?;
        let plaintext_file = NamedTempFile::new().map_err(|e| {
            StoreError::ConnectionFailed(format!("failed to create temporary store file: {e}"))
        })?;

        if real_path.exists() {
            let plaintext = vault.decrypt_file(real_path).map_err(StoreError::Encryption)?;
            std::fs::write(plaintext_file.path(), &*plaintext).map_err(|e| {
                StoreError::ConnectionFailed(format!("failed to stage decrypted store: {e}"))
            })?;
        }

        let db = DatabasePool::new(plaintext_file.path()).await?;

        Ok(Self {
            real_path: real_path.to_path_buf(),
            vault,
            _plaintext_file: plaintext_file,
            db,
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        self.db.pool()
    }

    /// Re-encrypts the current plaintext tempfile contents back to
    /// `real_path`, overwriting any previous contents atomically via a
    /// write-then-rename performed by [`Vault::encrypt_file`]'s caller.
    ///
    /// Call after a batch of mutations completes; the capacity/sync engines
    /// call this once per run rather than per statement.
    pub async fn seal(&self) -> Result<(), StoreError> {
        self.pool().execute_checkpoint().await?;
        let plaintext = std::fs::read(self._plaintext_file.path()).map_err(|e| {
            StoreError::ConnectionFailed(format!("failed to read plaintext store for sealing: {e}"))
        })?;
        self.vault
            .encrypt_file(&self.real_path, &plaintext)
            .map_err(StoreError::Encryption)?;
        Ok(())
    }
}

/// Tiny extension trait so `seal` can force a WAL checkpoint before reading
/// the plaintext file back off disk; otherwise recent writes may still be
/// sitting only in the `-wal` sidecar file.
#[async_trait::async_trait]
trait Checkpoint {
    async fn execute_checkpoint(&self) -> Result<(), StoreError>;
}

#[async_trait::async_trait]
impl Checkpoint for SqlitePool {
    async fn execute_checkpoint(&self) -> Result<(), StoreError> {
        sqlx::raw_sql("PRAGMA wal_checkpoint(TRUNCATE);")
            .execute(self)
            .await?;
        Ok(())
    }
}
