//! Store-local error type

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to connect to store: {0}")]
    ConnectionFailed(String),

    #[error("schema migration failed: {0}")]
    MigrationFailed(String),

    #[error("failed to (de)serialize a stored row: {0}")]
    SerializationError(String),

    #[error("encryption error: {0}")]
    Encryption(#[from] anyhow::Error),

    #[error(transparent)]
    Sql(#[from] sqlx::Error),
}
