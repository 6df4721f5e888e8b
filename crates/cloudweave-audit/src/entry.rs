//! Audit entry domain types
//!
//! An [`AuditEntry`] records one mutating (or would-be mutating, under I6
//! safe mode) operation the sync or capacity engine performed: what kind of
//! action it was, which logical file/account it touched, whether it
//! actually ran, and the outcome.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use cloudweave_core::domain::Provider;

use crate::reason::ReasonCode;

/// The kind of operation an [`AuditEntry`] records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A missing-replica copy was created on a provider (I1).
    Replicate,
    /// A conflicting replica was copied under a renamed path (I2).
    ConflictCopy,
    /// A replica was converged to its provider's "soft-deleted" state (I3).
    SoftDeleteConverge,
    /// A replica was converged to its provider's "gone" state (I4).
    HardDeleteConverge,
    /// An empty folder was mirrored onto a provider (I5).
    FolderCreate,
    /// A cross-account Microsoft shortcut was created (§4.4).
    MicrosoftShortcut,
    /// A capacity-engine ownership transfer or copy-then-delete move.
    CapacityMove,
    /// A non-fatal error encountered during an engine pass.
    Error,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AuditAction::Replicate => "replicate",
            AuditAction::ConflictCopy => "conflict_copy",
            AuditAction::SoftDeleteConverge => "soft_delete_converge",
            AuditAction::HardDeleteConverge => "hard_delete_converge",
            AuditAction::FolderCreate => "folder_create",
            AuditAction::MicrosoftShortcut => "microsoft_shortcut",
            AuditAction::CapacityMove => "capacity_move",
            AuditAction::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// Outcome of the operation an [`AuditEntry`] records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditResult {
    Success,
    Failed { code: String, message: String },
}

impl AuditResult {
    #[must_use]
    pub fn success() -> Self {
        AuditResult::Success
    }

    #[must_use]
    pub fn failed(code: impl Into<String>, message: impl Into<String>) -> Self {
        AuditResult::Failed { code: code.into(), message: message.into() }
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, AuditResult::Failed { .. })
    }
}

/// One recorded engine operation, executed or (in I6 safe mode) skipped
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    pub result: AuditResult,
    /// `true` when I6 safe mode suppressed the actual mutation; the entry
    /// still records what *would* have happened.
    pub dry_run: bool,
    pub path: Option<String>,
    pub provider: Option<Provider>,
    pub account_id: Option<String>,
    pub reason: Option<ReasonCode>,
    pub details: Value,
}

impl AuditEntry {
    #[must_use]
    pub fn new(action: AuditAction, result: AuditResult, dry_run: bool) -> Self {
        Self {
            timestamp: Utc::now(),
            action,
            result,
            dry_run,
            path: None,
            provider: None,
            account_id: None,
            reason: None,
            details: Value::Null,
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn with_account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    #[must_use]
    pub fn with_reason(mut self, reason: ReasonCode) -> Self {
        self.reason = Some(reason);
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_every_optional_field() {
        let entry = AuditEntry::new(AuditAction::Replicate, AuditResult::success(), false)
            .with_path("docs/report.docx")
            .with_provider(Provider::Microsoft)
            .with_account("user@example.com")
            .with_reason(ReasonCode::ReplicaMissing);

        assert_eq!(entry.path.as_deref(), Some("docs/report.docx"));
        assert_eq!(entry.provider, Some(Provider::Microsoft));
        assert_eq!(entry.account_id.as_deref(), Some("user@example.com"));
        assert_eq!(entry.reason, Some(ReasonCode::ReplicaMissing));
        assert!(!entry.dry_run);
    }

    #[test]
    fn failed_result_reports_failed() {
        let result = AuditResult::failed("TRANSFER_FAILED", "quota exceeded");
        assert!(result.is_failed());
        assert!(!AuditResult::success().is_failed());
    }
}
