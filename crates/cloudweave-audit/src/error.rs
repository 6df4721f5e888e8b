//! Error types for the audit subsystem

use thiserror::Error;

/// Errors raised while appending to or reading an audit sink
#[derive(Debug, Error)]
pub enum AuditError {
    /// The sink's backing file could not be opened or written to.
    #[error("audit sink I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// An entry could not be serialized to its on-disk representation.
    #[error("audit entry serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
