//! `AuditLogger` — high-level audit logging service and I6 safe-mode gate
//!
//! Wraps an [`AuditSink`] with one convenience method per kind of mutating
//! operation the sync and capacity engines perform, and carries the I6
//! `safe_mode` flag so a caller asks the logger, not its own config, whether
//! to skip the mutation. All logging methods are non-fatal: a sink failure
//! is logged via `tracing::warn!` but never propagated, exactly as the
//! teacher's `AuditLogger` treats `IStateRepository::save_audit` failures.

use std::sync::Arc;

use serde_json::Value;

use cloudweave_core::domain::Provider;

use crate::entry::{AuditAction, AuditEntry, AuditResult};
use crate::reason::ReasonCode;
use crate::sink::AuditSink;

/// High-level audit logger gating I6 safe mode and recording every
/// mutating operation the engines perform (or would have performed).
pub struct AuditLogger {
    sink: Arc<dyn AuditSink>,
    safe_mode: bool,
}

impl AuditLogger {
    #[must_use]
    pub fn new(sink: Arc<dyn AuditSink>, safe_mode: bool) -> Self {
        Self { sink, safe_mode }
    }

    /// True when the engine must log rather than execute (I6).
    #[must_use]
    pub fn is_dry_run(&self) -> bool {
        self.safe_mode
    }

    async fn record(&self, entry: AuditEntry) {
        if let Err(e) = self.sink.append(&entry).await {
            tracing::warn!(error = %e, action = %entry.action, "failed to append audit entry");
        }
    }

    /// Records a missing-replica copy (I1), executed or dry-run.
    pub async fn log_replicate(&self, path: &str, provider: Provider, account_id: &str) {
        let entry = AuditEntry::new(AuditAction::Replicate, AuditResult::success(), self.safe_mode)
            .with_path(path)
            .with_provider(provider)
            .with_account(account_id)
            .with_reason(ReasonCode::ReplicaMissing);
        self.record(entry).await;
    }

    /// Records a conflict-copy resolution (I2).
    pub async fn log_conflict_copy(&self, path: &str, conflict_name: &str, provider: Provider) {
        let entry = AuditEntry::new(AuditAction::ConflictCopy, AuditResult::success(), self.safe_mode)
            .with_path(path)
            .with_provider(provider)
            .with_reason(ReasonCode::CalculatedIdConflict)
            .with_details(serde_json::json!({ "conflict_name": conflict_name }));
        self.record(entry).await;
    }

    /// Records one replica's convergence to soft-deleted (I3).
    pub async fn log_soft_delete_converge(&self, path: &str, provider: Provider, account_id: &str) {
        let entry = AuditEntry::new(AuditAction::SoftDeleteConverge, AuditResult::success(), self.safe_mode)
            .with_path(path)
            .with_provider(provider)
            .with_account(account_id)
            .with_reason(ReasonCode::SoftDeletePathMatch);
        self.record(entry).await;
    }

    /// Records one replica's convergence to hard-deleted (I4).
    pub async fn log_hard_delete_converge(&self, path: &str, provider: Provider, account_id: &str) {
        let entry = AuditEntry::new(AuditAction::HardDeleteConverge, AuditResult::success(), self.safe_mode)
            .with_path(path)
            .with_provider(provider)
            .with_account(account_id)
            .with_reason(ReasonCode::GoogleReplicaGone);
        self.record(entry).await;
    }

    /// Records an empty-folder mirror (I5).
    pub async fn log_folder_create(&self, path: &str, provider: Provider, account_id: &str) {
        let entry = AuditEntry::new(AuditAction::FolderCreate, AuditResult::success(), self.safe_mode)
            .with_path(path)
            .with_provider(provider)
            .with_account(account_id);
        self.record(entry).await;
    }

    /// Records a cross-account Microsoft shortcut creation.
    pub async fn log_microsoft_shortcut(&self, path: &str, source_account: &str, target_account: &str) {
        let entry = AuditEntry::new(AuditAction::MicrosoftShortcut, AuditResult::success(), self.safe_mode)
            .with_path(path)
            .with_provider(Provider::Microsoft)
            .with_account(target_account)
            .with_details(serde_json::json!({ "source_account": source_account }));
        self.record(entry).await;
    }

    /// Records a capacity-engine transfer or copy-then-delete move.
    pub async fn log_capacity_move(&self, path: &str, provider: Provider, destination_account: &str, via: &str) {
        let entry = AuditEntry::new(AuditAction::CapacityMove, AuditResult::success(), self.safe_mode)
            .with_path(path)
            .with_provider(provider)
            .with_account(destination_account)
            .with_details(serde_json::json!({ "via": via }));
        self.record(entry).await;
    }

    /// Records a non-fatal error encountered during an engine pass.
    pub async fn log_error(&self, action: AuditAction, message: &str, details: Value) {
        let entry = AuditEntry::new(action, AuditResult::failed("ENGINE_ERROR", message), false)
            .with_details(details);
        self.record(entry).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemoryAuditSink;

    #[tokio::test]
    async fn safe_mode_stamps_every_entry_as_dry_run() {
        let sink = Arc::new(MemoryAuditSink::new());
        let logger = AuditLogger::new(sink.clone(), true);
        assert!(logger.is_dry_run());

        logger.log_replicate("a/b.txt", Provider::Google, "acct@example.com").await;
        logger.log_folder_create("a/b", Provider::Microsoft, "acct2@example.com").await;

        let entries = sink.entries().await;
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.dry_run));
    }

    #[tokio::test]
    async fn live_mode_stamps_every_entry_as_executed() {
        let sink = Arc::new(MemoryAuditSink::new());
        let logger = AuditLogger::new(sink.clone(), false);
        assert!(!logger.is_dry_run());

        logger.log_replicate("a/b.txt", Provider::Telegram, "+15550000").await;

        let entries = sink.entries().await;
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].dry_run);
        assert_eq!(entries[0].reason, Some(ReasonCode::ReplicaMissing));
    }

    #[tokio::test]
    async fn error_entries_are_never_marked_dry_run() {
        let sink = Arc::new(MemoryAuditSink::new());
        let logger = AuditLogger::new(sink.clone(), true);

        logger.log_error(AuditAction::Replicate, "download failed", serde_json::json!({"path": "a.txt"})).await;

        let entries = sink.entries().await;
        assert!(!entries[0].dry_run);
        assert!(entries[0].result.is_failed());
    }
}
