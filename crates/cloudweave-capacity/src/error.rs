//! Error types for the capacity engine

use thiserror::Error;

/// Errors that can occur during a rebalance or free-main pass
#[derive(Debug, Error)]
pub enum CapacityError {
    /// No live provider adapter is registered for an account a transfer
    /// needs to read from or write to.
    #[error("no provider adapter registered for account {0}")]
    UnknownAccount(String),

    /// Both the native transfer attempt and the copy-then-delete fallback
    /// failed for one file; the source account is left in place and the
    /// failure counter for it is incremented.
    #[error("transfer of {path} from {source} to {destination} failed: {reason}")]
    TransferFailed {
        path: String,
        source: String,
        destination: String,
        reason: String,
    },

    /// Store or provider error surfaced verbatim from a port boundary.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}
