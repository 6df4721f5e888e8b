//! Error types for the conflict engine

use thiserror::Error;

/// Errors that can occur during conflict detection and resolution
#[derive(Debug, Error)]
pub enum ConflictError {
    /// No live provider adapter is registered for the account a pair needs.
    #[error("no provider adapter registered for account {0}")]
    UnknownAccount(String),

    /// The upload or store write that resolves a pair failed.
    #[error("conflict resolution failed: {0}")]
    ResolutionFailed(String),

    /// Provider or store error surfaced verbatim from the port boundary.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}
