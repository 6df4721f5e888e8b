//! The unified error type surfaced at the CLI boundary
//!
//! Internal crates mostly propagate `anyhow::Error`/[`crate::domain::DomainError`];
//! this type exists so `cloudweave-cli` has one thing to match on for exit
//! codes and one thing to render for `--json` output.

use thiserror::Error;

use crate::domain::DomainError;

#[derive(Debug, Error)]
pub enum CloudweaveError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[source] anyhow::Error),

    #[error("provider error ({provider}): {source}")]
    Provider {
        provider: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CloudweaveError {
    /// Process exit code used by the CLI, per the teacher's convention of
    /// reserving low codes for well-known failure classes.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            CloudweaveError::Domain(_) => 2,
            CloudweaveError::Config(_) => 3,
            CloudweaveError::Store(_) => 4,
            CloudweaveError::Provider { .. } => 5,
            CloudweaveError::Other(_) => 1,
        }
    }
}
