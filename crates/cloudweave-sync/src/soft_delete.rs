//! Soft-delete convergence (I3)
//!
//! When a user moves a file to trash on one provider, the scanner observes
//! its replica's path already relocated under `sync-cloud-drives-aux/
//! soft-deleted/`. This pass notices a logical file with at least one
//! replica living there while its other replicas still sit at the active
//! path, and converges the rest: on Google/Microsoft by rebasing the path
//! and calling [`CloudProvider::move_item`], on Telegram (no native folder
//! hierarchy) by calling [`CloudProvider::mark_deleted`] to edit the
//! message caption's status instead.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use cloudweave_audit::AuditLogger;
use cloudweave_core::domain::{AccountId, FileStatus, SyncPath};
use cloudweave_core::ports::{CloudProvider, MetadataStore};

use crate::error::SyncError;

const SOFT_DELETED_PREFIX: &str = "sync-cloud-drives-aux/soft-deleted";

/// Rewrites `path`'s top-level segment under the soft-deleted prefix,
/// preserving the rest of the path (e.g. `"r/y.bin"` -> `"sync-cloud-
/// drives-aux/soft-deleted/r/y.bin"`), via [`SyncPath::rebase`].
fn soft_deleted_path(path: &SyncPath, aux_prefix: &SyncPath) -> anyhow::Result<SyncPath> {
    let top_level = path.as_str().split('/').next().unwrap_or_else(|| path.as_str());
    let old_prefix = SyncPath::new(top_level)?;
    let new_prefix = aux_prefix.join(top_level)?;
    Ok(path.rebase(&old_prefix, &new_prefix)?)
}

/// Outcome of one [`converge`] call.
#[derive(Debug, Default, Clone)]
pub struct SoftDeleteReport {
    pub converged: u64,
    pub failures: Vec<String>,
}

/// Converges every logical file with a partial soft-delete to fully
/// soft-deleted across all of its active replicas.
pub async fn converge(
    store: &Arc<dyn MetadataStore>,
    providers: &HashMap<AccountId, Arc<dyn CloudProvider>>,
    audit: &AuditLogger,
    stop_on_error: bool,
) -> Result<SoftDeleteReport, SyncError> {
    let aux_prefix = SyncPath::new(SOFT_DELETED_PREFIX).map_err(anyhow::Error::from)?;
    let mut report = SoftDeleteReport::default();

    for logical_file in store.list_logical_files().await? {
        if logical_file.status() != FileStatus::Active {
            continue;
        }

        let replicas = store.get_replicas_for_logical_file(logical_file.id()).await?;
        let trashed = replicas
            .iter()
            .any(|r| r.status() == FileStatus::Active && r.path().starts_with(&aux_prefix));
        if !trashed {
            continue;
        }

        for replica in replicas.iter().filter(|r| {
            r.status() == FileStatus::Active && !r.path().starts_with(&aux_prefix)
        }) {
            let Some(provider) = providers.get(replica.account_id()) else {
                let err = SyncError::UnknownAccount(replica.account_id().to_string());
                if stop_on_error {
                    return Err(err);
                }
                report.failures.push(err.to_string());
                continue;
            };

            if audit.is_dry_run() {
                audit
                    .log_soft_delete_converge(replica.path().as_str(), provider.provider(), replica.account_id().as_str())
                    .await;
                report.converged += 1;
                continue;
            }

            let result = if provider.provider().has_native_folders() {
                converge_native(provider, replica, &aux_prefix, store).await
            } else {
                converge_caption(provider, replica, store).await
            };

            match result {
                Ok(()) => {
                    audit
                        .log_soft_delete_converge(replica.path().as_str(), provider.provider(), replica.account_id().as_str())
                        .await;
                    report.converged += 1;
                }
                Err(e) => {
                    if stop_on_error {
                        return Err(e.into());
                    }
                    report.failures.push(e.to_string());
                }
            }
        }

        let mut updated = logical_file.clone();
        updated.set_status(FileStatus::SoftDeleted);
        store.upsert_logical_file(&updated).await?;

        info!(path = %logical_file.path(), "logical file converged to soft-deleted");
    }

    Ok(report)
}

async fn converge_native(
    provider: &Arc<dyn CloudProvider>,
    replica: &cloudweave_core::domain::Replica,
    aux_prefix: &SyncPath,
    store: &Arc<dyn MetadataStore>,
) -> anyhow::Result<()> {
    let new_path = soft_deleted_path(replica.path(), aux_prefix)?;
    if let Some(parent) = new_path.parent() {
        provider.create_folder(&parent).await?;
    }
    provider.move_item(replica.native_id(), &new_path).await?;

    let mut updated = replica.clone();
    updated.set_path(new_path);
    updated.set_status(FileStatus::SoftDeleted);
    store.batch_upsert_replicas(std::slice::from_ref(&updated)).await?;
    Ok(())
}

async fn converge_caption(
    provider: &Arc<dyn CloudProvider>,
    replica: &cloudweave_core::domain::Replica,
    store: &Arc<dyn MetadataStore>,
) -> anyhow::Result<()> {
    provider.mark_deleted(replica.native_id()).await?;

    let mut updated = replica.clone();
    updated.set_status(FileStatus::SoftDeleted);
    store.batch_upsert_replicas(std::slice::from_ref(&updated)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soft_deleted_path_rebases_top_level_segment() {
        let aux = SyncPath::new(SOFT_DELETED_PREFIX).unwrap();
        let path = SyncPath::new("r/y.bin").unwrap();
        let rebased = soft_deleted_path(&path, &aux).unwrap();
        assert_eq!(rebased.as_str(), "sync-cloud-drives-aux/soft-deleted/r/y.bin");
    }

    #[test]
    fn soft_deleted_path_handles_top_level_file() {
        let aux = SyncPath::new(SOFT_DELETED_PREFIX).unwrap();
        let path = SyncPath::new("note.txt").unwrap();
        let rebased = soft_deleted_path(&path, &aux).unwrap();
        assert_eq!(rebased.as_str(), "sync-cloud-drives-aux/soft-deleted/note.txt");
    }
}
