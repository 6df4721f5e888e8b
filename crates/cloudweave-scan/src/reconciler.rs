//! Store reconciliation pipeline run after one scan pass drains (spec §4.3)
//!
//! Runs in the fixed order the spec requires: stabilize logical identity
//! first so link targets exist, then link/promote orphans, then tombstone
//! anything not seen since `T0`, then propagate Google-side hard deletes
//! (I4) last, since that step depends on the scan's view of Google already
//! being reflected in the store.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use cloudweave_core::domain::{AccountId, FileStatus, Provider};
use cloudweave_core::ports::{CloudProvider, MetadataStore};

use crate::error::ScanError;

/// Row counts from one reconcile pipeline run.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReconcileReport {
    pub logical_files_updated: u64,
    pub replicas_linked: u64,
    pub replicas_promoted: u64,
    pub rows_marked_deleted: u64,
    pub hard_deletes_propagated: u64,
}

/// Runs the store-only reconcile steps plus Google-authoritative
/// hard-delete propagation.
pub struct Reconciler {
    store: Arc<dyn MetadataStore>,
    providers: HashMap<AccountId, Arc<dyn CloudProvider>>,
}

impl Reconciler {
    #[must_use]
    pub fn new(store: Arc<dyn MetadataStore>, providers: HashMap<AccountId, Arc<dyn CloudProvider>>) -> Self {
        Self { store, providers }
    }

    /// Runs all five reconcile steps for a scan pass that started at `t0`.
    pub async fn run(&self, t0: chrono::DateTime<chrono::Utc>) -> Result<ReconcileReport, ScanError> {
        let mut report = ReconcileReport::default();

        report.logical_files_updated = self.store.update_logical_from_latest_replica().await?;
        report.replicas_linked = self.store.link_orphaned_replicas().await?;
        report.replicas_promoted = self.store.promote_orphaned_replicas().await?;
        report.rows_marked_deleted = self.store.mark_stale_deleted(t0).await?;
        report.hard_deletes_propagated = self.propagate_hard_deletes().await?;

        info!(
            updated = report.logical_files_updated,
            linked = report.replicas_linked,
            promoted = report.replicas_promoted,
            stale = report.rows_marked_deleted,
            hard_deleted = report.hard_deletes_propagated,
            "Reconcile pipeline complete"
        );

        Ok(report)
    }

    /// (I4) A soft-deleted logical file with no active Google replica is
    /// hard-deleted everywhere: its status becomes `deleted`, and every
    /// remaining non-deleted, non-Google replica is converged to its
    /// provider's notion of "gone" via [`CloudProvider::mark_deleted`]
    /// (a physical delete for Microsoft, a caption-status edit for Telegram).
    async fn propagate_hard_deletes(&self) -> Result<u64, ScanError> {
        let mut count = 0u64;

        for logical_file in self.store.list_logical_files().await.map_err(ScanError::Storage)? {
            if logical_file.status() != FileStatus::SoftDeleted {
                continue;
            }

            let replicas = self
                .store
                .get_replicas_for_logical_file(logical_file.id())
                .await
                .map_err(ScanError::Storage)?;

            let google_active = replicas
                .iter()
                .any(|r| r.provider() == Provider::Google && r.status() == FileStatus::Active);
            if google_active {
                continue;
            }

            let mut deleted_file = logical_file.clone();
            deleted_file.set_status(FileStatus::Deleted);
            self.store.upsert_logical_file(&deleted_file).await.map_err(ScanError::Storage)?;

            for replica in replicas {
                if replica.status() == FileStatus::Deleted || replica.provider() == Provider::Google {
                    continue;
                }

                let provider = self
                    .providers
                    .get(replica.account_id())
                    .ok_or_else(|| ScanError::UnknownAccount(replica.account_id().to_string()))?;

                provider.mark_deleted(replica.native_id()).await.map_err(ScanError::Storage)?;

                let mut updated = replica.clone();
                updated.set_status(FileStatus::Deleted);
                self.store
                    .batch_upsert_replicas(std::slice::from_ref(&updated))
                    .await
                    .map_err(ScanError::Storage)?;
                count += 1;
            }
        }

        Ok(count)
    }
}
