//! Cross-provider sync engine orchestration (spec §4.4, invariants I1-I6)
//!
//! Runs every pass once per call to [`SyncEngine::run`], in the fixed order
//! the spec's concurrency model requires: soft-delete convergence (I3),
//! then missing-replica replication (I1) together with conflict resolution
//! (I2), then folder-skeleton mirroring (I5), then cross-account Microsoft
//! shortcuts. I6 safe mode is not a separate pass — every pass asks the
//! shared [`AuditLogger`] whether it's in dry-run before calling into a
//! provider, and logs either way.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use cloudweave_audit::AuditLogger;
use cloudweave_conflict::{ConflictResolver, ResolveConflictsUseCase};
use cloudweave_core::domain::{AccountId, FileStatus};
use cloudweave_core::ports::{Clock, CloudProvider, MetadataStore, ReplicaFilter};

use crate::error::SyncError;
use crate::folder_skeleton;
use crate::replication;
use crate::shortcuts;
use crate::soft_delete;

/// Summary of one complete sync pass.
#[derive(Debug, Default, Clone)]
pub struct SyncReport {
    pub soft_deletes_converged: u64,
    pub replicas_copied: u64,
    pub conflicts_resolved: u64,
    pub conflicts_failed: u64,
    pub folders_created: u64,
    pub shortcuts_created: u64,
    pub failures: Vec<String>,
}

impl SyncReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Orchestrates one cross-provider sync pass against a live set of adapters.
pub struct SyncEngine {
    store: Arc<dyn MetadataStore>,
    providers: HashMap<AccountId, Arc<dyn CloudProvider>>,
    audit: Arc<AuditLogger>,
    clock: Arc<dyn Clock>,
    stop_on_error: bool,
}

impl SyncEngine {
    #[must_use]
    pub fn new(
        store: Arc<dyn MetadataStore>,
        providers: HashMap<AccountId, Arc<dyn CloudProvider>>,
        audit: Arc<AuditLogger>,
        clock: Arc<dyn Clock>,
        stop_on_error: bool,
    ) -> Self {
        Self { store, providers, audit, clock, stop_on_error }
    }

    /// Runs the full fixed-order sync pass once.
    pub async fn run(&self) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::default();

        let soft_delete_report =
            soft_delete::converge(&self.store, &self.providers, &self.audit, self.stop_on_error).await?;
        report.soft_deletes_converged = soft_delete_report.converged;
        report.failures.extend(soft_delete_report.failures);

        let replication_report =
            replication::replicate_missing_copies(&self.store, &self.providers, &self.audit, self.stop_on_error)
                .await?;
        report.replicas_copied = replication_report.copied;
        report.failures.extend(replication_report.failures);

        let conflict_report = self.resolve_conflicts().await?;
        report.conflicts_resolved = conflict_report.resolved.len() as u64;
        report.conflicts_failed = conflict_report.failed.len() as u64;
        report.failures.extend(conflict_report.failed.iter().map(|(pair, reason)| {
            format!("conflict at {}: {reason}", pair.master.path())
        }));

        let folder_report =
            folder_skeleton::mirror(&self.store, &self.providers, &self.audit, self.stop_on_error).await?;
        report.folders_created = folder_report.folders_created;
        report.failures.extend(folder_report.failures);

        let shortcut_report =
            shortcuts::create_shortcuts(&self.store, &self.providers, &self.audit, self.stop_on_error).await?;
        report.shortcuts_created = shortcut_report.shortcuts_created;
        report.failures.extend(shortcut_report.failures);

        info!(
            soft_deletes = report.soft_deletes_converged,
            replicated = report.replicas_copied,
            conflicts_resolved = report.conflicts_resolved,
            conflicts_failed = report.conflicts_failed,
            folders_created = report.folders_created,
            shortcuts_created = report.shortcuts_created,
            failures = report.failures.len(),
            "sync pass complete"
        );

        Ok(report)
    }

    async fn resolve_conflicts(&self) -> Result<cloudweave_conflict::ConflictRunReport, SyncError> {
        let active = self
            .store
            .list_replicas(&ReplicaFilter::new())
            .await?
            .into_iter()
            .filter(|r| r.status() == FileStatus::Active)
            .collect::<Vec<_>>();

        if self.audit.is_dry_run() {
            let pairs = cloudweave_conflict::ConflictDetector::find(&active);
            for pair in &pairs {
                self.audit
                    .log_conflict_copy(pair.master.path().as_str(), "(dry-run)", pair.master.provider())
                    .await;
            }
            return Ok(cloudweave_conflict::ConflictRunReport {
                resolved: Vec::new(),
                failed: Vec::new(),
            });
        }

        let providers_by_account: HashMap<String, Arc<dyn CloudProvider>> =
            self.providers.iter().map(|(id, provider)| (id.to_string(), provider.clone())).collect();
        let resolver = ConflictResolver::new(self.store.clone(), providers_by_account, self.clock.clone());
        let use_case = ResolveConflictsUseCase::new(resolver);
        let report = use_case.run(&active).await;

        for resolved in &report.resolved {
            self.audit
                .log_conflict_copy(resolved.path().as_str(), resolved.name(), resolved.provider())
                .await;
        }

        if self.stop_on_error {
            if let Some((_, reason)) = report.failed.first() {
                return Err(anyhow::anyhow!("conflict resolution failed: {reason}").into());
            }
        }

        Ok(report)
    }
}
