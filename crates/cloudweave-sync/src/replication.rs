//! Missing-replica replication (I1)
//!
//! Every active logical file is expected to hold one active replica on the
//! main account of each configured provider. When a provider has none, its
//! bytes are streamed straight from the highest-priority provider that does
//! (G ≻ M ≻ T, the same ordering [`cloudweave_conflict`] uses to pick a
//! conflict master) onto the missing provider's main account, under the
//! logical file's own path.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use cloudweave_audit::AuditLogger;
use cloudweave_core::domain::{AccountId, FileStatus, LogicalFile, Provider, Replica};
use cloudweave_core::ports::{CloudProvider, MetadataStore};

use crate::error::SyncError;

/// Outcome of one [`replicate_missing_copies`] call.
#[derive(Debug, Default, Clone)]
pub struct ReplicationReport {
    pub copied: u64,
    pub failures: Vec<String>,
}

/// Copies every active logical file onto every configured provider missing
/// an active replica of it.
pub async fn replicate_missing_copies(
    store: &Arc<dyn MetadataStore>,
    providers: &HashMap<AccountId, Arc<dyn CloudProvider>>,
    audit: &AuditLogger,
    stop_on_error: bool,
) -> Result<ReplicationReport, SyncError> {
    let mut main_account_by_provider: HashMap<Provider, AccountId> = HashMap::new();
    for account in store.list_accounts().await? {
        if account.is_main() {
            main_account_by_provider.insert(account.provider(), account.id().clone());
        }
    }

    let mut report = ReplicationReport::default();

    for logical_file in store.list_logical_files().await? {
        if logical_file.status() != FileStatus::Active {
            continue;
        }

        let replicas = store.get_replicas_for_logical_file(logical_file.id()).await?;
        let active: Vec<&Replica> = replicas.iter().filter(|r| r.status() == FileStatus::Active).collect();
        if active.is_empty() {
            continue;
        }

        let Some(source) = active.iter().min_by_key(|r| r.provider().priority()).copied() else {
            continue;
        };

        for provider in Provider::ALL_BY_PRIORITY {
            if active.iter().any(|r| r.provider() == provider) {
                continue;
            }
            let Some(dst_account) = main_account_by_provider.get(&provider) else {
                warn!(provider = %provider, "no main account configured, skipping replication target");
                continue;
            };

            match replicate_one(store, providers, audit, &logical_file, source, dst_account).await {
                Ok(()) => report.copied += 1,
                Err(e) => {
                    if stop_on_error {
                        return Err(e);
                    }
                    report.failures.push(e.to_string());
                }
            }
        }
    }

    Ok(report)
}

async fn replicate_one(
    store: &Arc<dyn MetadataStore>,
    providers: &HashMap<AccountId, Arc<dyn CloudProvider>>,
    audit: &AuditLogger,
    logical_file: &LogicalFile,
    source: &Replica,
    dst_account: &AccountId,
) -> Result<(), SyncError> {
    let dst_provider = providers
        .get(dst_account)
        .ok_or_else(|| SyncError::UnknownAccount(dst_account.to_string()))?;
    let src_provider = providers
        .get(source.account_id())
        .ok_or_else(|| SyncError::UnknownAccount(source.account_id().to_string()))?;

    if audit.is_dry_run() {
        audit.log_replicate(logical_file.path().as_str(), dst_provider.provider(), dst_account.as_str()).await;
        return Ok(());
    }

    if let Some(parent) = logical_file.path().parent() {
        dst_provider.create_folder(&parent).await?;
    }

    let stream = src_provider.download(source.native_id()).await?;
    let parent = logical_file.path().parent().unwrap_or_else(|| logical_file.path().clone());
    let entry = dst_provider.upload(&parent, logical_file.name(), logical_file.size(), stream).await?;

    let replica = Replica::new(
        logical_file.id(),
        dst_account.clone(),
        dst_provider.provider(),
        entry.native_id,
        entry.hash,
        entry.path,
        entry.size,
        entry.modified,
    );
    store.batch_upsert_replicas(std::slice::from_ref(&replica)).await?;

    audit.log_replicate(logical_file.path().as_str(), dst_provider.provider(), dst_account.as_str()).await;
    info!(path = %logical_file.path(), provider = %dst_provider.provider(), "replicated missing copy");

    Ok(())
}
