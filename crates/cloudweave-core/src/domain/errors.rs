//! Domain error types
//!
//! Validation failures and invariant violations raised by the domain model
//! itself, as opposed to [`crate::domain::ProviderErrorKind`] which classifies
//! failures coming back from a provider adapter.

use thiserror::Error;

/// Errors that can occur constructing or mutating domain entities
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("path not within sync root: {0}")]
    PathNotInSyncRoot(String),

    #[error("invalid id: {0}")]
    InvalidId(String),

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = DomainError::InvalidPath("/bad".into());
        assert_eq!(err.to_string(), "invalid path: /bad");
    }
}
