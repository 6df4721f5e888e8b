//! Shared provider error taxonomy and retry helper
//!
//! Every adapter (`google`, `microsoft`, `telegram`) maps its own API error
//! shapes onto this one enum so the engines upstream never match on a
//! provider-specific error type.

use std::time::Duration;

use thiserror::Error;

/// Classified failure from a cloud provider adapter (spec §7)
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Credentials invalid, expired, or revoked; needs re-auth, not a retry.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The request could resolve to more than one remote object (e.g. two
    /// items with the same name in the same folder) and the caller must
    /// disambiguate before retrying.
    #[error("ambiguous match: {0}")]
    Ambiguity(String),

    /// Provider is throttling; retry after the given duration.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimit { retry_after: Duration },

    /// Transient failure (timeout, 5xx, connection reset) worth retrying
    /// without a specific backoff hint.
    #[error("transient error: {0}")]
    Transient(String),

    /// The requested remote object does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The authenticated account lacks permission for this operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The provider requires the account holder to grant consent
    /// out-of-band before the operation can proceed (observed on Google
    /// ownership transfer).
    #[error("consent required: {0}")]
    ConsentRequired(String),

    /// The object exceeds a provider-side size ceiling (e.g. Telegram's
    /// per-message limit, handled below this layer by fragmentation, or a
    /// hard provider maximum above which fragmentation can't help).
    #[error("size limit exceeded: {0}")]
    SizeLimit(String),

    /// The account has insufficient free space for this operation.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// A downloaded or uploaded object's size/hash didn't match what the
    /// provider reported.
    #[error("integrity check failed: {0}")]
    Integrity(String),

    /// Any error not covered above; wraps the underlying cause.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ProviderError {
    /// Whether an operation that failed with this error is safe to retry
    /// unchanged.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::RateLimit { .. } | ProviderError::Transient(_))
    }

    /// Backoff hint for this error, if any.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ProviderError::RateLimit { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

/// Maximum number of attempts [`with_retry`] makes before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Runs `op`, retrying with exponential backoff while the error is
/// [`ProviderError::is_retryable`], up to [`DEFAULT_MAX_ATTEMPTS`] attempts.
///
/// Generalizes the teacher's `execute_with_retry`/429-handling loop in
/// `client.rs` into a provider-agnostic helper all three adapters share.
pub async fn with_retry<T, F, Fut>(mut op: F) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, ProviderError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < DEFAULT_MAX_ATTEMPTS => {
                let wait = err
                    .retry_after()
                    .unwrap_or_else(|| Duration::from_millis(250 * 2u64.pow(attempt - 1)));
                tracing::warn!(attempt, ?wait, error = %err, "retrying provider call");
                tokio::time::sleep(wait).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let attempts = AtomicU32::new(0);
        let result: Result<&str, ProviderError> = with_retry(|| async {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(ProviderError::Transient("flaky".into()))
            } else {
                Ok("ok")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_non_retryable_errors() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), ProviderError> = with_retry(|| async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::NotFound("gone".into()))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
