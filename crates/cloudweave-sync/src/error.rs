//! Error types for the sync engine

use thiserror::Error;

/// Errors that can occur during a sync pass
#[derive(Debug, Error)]
pub enum SyncError {
    /// No live provider adapter is registered for an account a pass needs.
    #[error("no provider adapter registered for account {0}")]
    UnknownAccount(String),

    /// Store or provider error surfaced verbatim from a port boundary,
    /// raised immediately instead of collected when `stop_on_error` is set.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}
