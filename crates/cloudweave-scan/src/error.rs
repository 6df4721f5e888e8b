//! Error types for the scanner and reconciler

use thiserror::Error;

/// Errors that can occur during a scan pass or reconcile pipeline run
#[derive(Debug, Error)]
pub enum ScanError {
    /// No live provider adapter is registered for an account the scan or
    /// hard-delete propagation pass needs.
    #[error("no provider adapter registered for account {0}")]
    UnknownAccount(String),

    /// An account's `list_changes` call failed; the account is skipped and
    /// every other account's task still completes (spec §7 propagation
    /// policy: log and continue per account, not per run).
    #[error("scan of account {account} failed: {source}")]
    AccountScanFailed {
        account: String,
        #[source]
        source: anyhow::Error,
    },

    /// Store or provider error surfaced verbatim from a port boundary.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}
