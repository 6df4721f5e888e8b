//! Provider tag and the outcome codes shared by the adapter port
//!
//! Per design note §9, per-provider quirks are captured as a polymorphic
//! capability set with distinct outcome codes rather than by subclassing a
//! base adapter type.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// One of the three supported cloud backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    /// Google-style drive
    Google,
    /// Microsoft-style drive
    Microsoft,
    /// Telegram-channel-as-blob-store
    Telegram,
}

impl Provider {
    /// All providers, in the priority order used to pick a conflict master
    /// (G ≻ M ≻ T).
    pub const ALL_BY_PRIORITY: [Provider; 3] =
        [Provider::Google, Provider::Microsoft, Provider::Telegram];

    /// Short code used in logs and the store (`G`, `M`, `T`).
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Provider::Google => "G",
            Provider::Microsoft => "M",
            Provider::Telegram => "T",
        }
    }

    /// Priority rank for conflict-master selection; lower is preferred.
    #[must_use]
    pub const fn priority(&self) -> u8 {
        match self {
            Provider::Google => 0,
            Provider::Microsoft => 1,
            Provider::Telegram => 2,
        }
    }

    /// Telegram has no concept of per-account storage quota.
    #[must_use]
    pub const fn is_unlimited(&self) -> bool {
        matches!(self, Provider::Telegram)
    }

    /// Telegram has no real folder hierarchy; paths are synthesized from
    /// caption metadata.
    #[must_use]
    pub const fn has_native_folders(&self) -> bool {
        !matches!(self, Provider::Telegram)
    }
}

impl Display for Provider {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Outcome of [`crate::ports::CloudProvider::transfer_ownership`]
///
/// A tagged enum rather than a boolean-plus-error so the capacity engine can
/// match exhaustively on every provider's behavior (§4.5, §9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Ownership changed immediately.
    Transferred,
    /// The provider requires the recipient to accept; caller must invoke
    /// `accept_pending_ownership` on the destination account.
    Pending,
    /// This provider does not support native ownership transfer at all
    /// (e.g. Microsoft).
    Unsupported,
    /// The provider refused because of a consent requirement the source
    /// account holder must grant out-of-band (observed on Google).
    ConsentRequired,
    /// Transfer attempted and failed for a reason not covered above.
    Error(String),
}

impl Display for TransferOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TransferOutcome::Transferred => write!(f, "transferred"),
            TransferOutcome::Pending => write!(f, "pending"),
            TransferOutcome::Unsupported => write!(f, "unsupported"),
            TransferOutcome::ConsentRequired => write!(f, "consent_required"),
            TransferOutcome::Error(msg) => write!(f, "error: {msg}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_order_matches_conflict_master_rule() {
        let mut by_priority = Provider::ALL_BY_PRIORITY;
        by_priority.sort_by_key(Provider::priority);
        assert_eq!(by_priority, [Provider::Google, Provider::Microsoft, Provider::Telegram]);
    }

    #[test]
    fn only_telegram_is_unlimited() {
        assert!(!Provider::Google.is_unlimited());
        assert!(!Provider::Microsoft.is_unlimited());
        assert!(Provider::Telegram.is_unlimited());
    }
}
