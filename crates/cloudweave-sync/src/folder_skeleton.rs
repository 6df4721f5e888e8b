//! Folder-skeleton propagation (I5)
//!
//! Mirrors the union of folder paths known across every native-folder
//! provider's main account (Google, Microsoft) onto any main account
//! missing one, even when the folder holds no files yet. Telegram is
//! skipped everywhere ([`Provider::has_native_folders`] is `false` for it);
//! its virtual directory structure comes from caption metadata instead.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::info;

use cloudweave_audit::AuditLogger;
use cloudweave_core::domain::{AccountId, SyncPath};
use cloudweave_core::ports::{CloudProvider, MetadataStore};

use crate::error::SyncError;

/// Outcome of one [`mirror`] call.
#[derive(Debug, Default, Clone)]
pub struct FolderSkeletonReport {
    pub folders_created: u64,
    pub failures: Vec<String>,
}

/// Creates every folder a native-folder provider's main account is missing,
/// parents before children.
pub async fn mirror(
    store: &Arc<dyn MetadataStore>,
    providers: &HashMap<AccountId, Arc<dyn CloudProvider>>,
    audit: &AuditLogger,
    stop_on_error: bool,
) -> Result<FolderSkeletonReport, SyncError> {
    let mut native_accounts = Vec::new();
    for account in store.list_accounts().await? {
        if account.is_main() && account.provider().has_native_folders() {
            native_accounts.push(account.id().clone());
        }
    }

    let mut folders_by_account: HashMap<AccountId, HashSet<SyncPath>> = HashMap::new();
    let mut all_paths: HashSet<SyncPath> = HashSet::new();
    for account_id in &native_accounts {
        let paths: HashSet<SyncPath> =
            store.list_folders(account_id).await?.into_iter().map(|f| f.path().clone()).collect();
        all_paths.extend(paths.iter().cloned());
        folders_by_account.insert(account_id.clone(), paths);
    }

    let mut missing: Vec<(AccountId, SyncPath)> = Vec::new();
    for account_id in &native_accounts {
        let existing = &folders_by_account[account_id];
        for path in &all_paths {
            if !existing.contains(path) {
                missing.push((account_id.clone(), path.clone()));
            }
        }
    }
    missing.sort_by_key(|(_, path)| path.as_str().matches('/').count());

    let mut report = FolderSkeletonReport::default();
    for (account_id, path) in missing {
        let Some(provider) = providers.get(&account_id) else {
            let err = SyncError::UnknownAccount(account_id.to_string());
            if stop_on_error {
                return Err(err);
            }
            report.failures.push(err.to_string());
            continue;
        };

        if audit.is_dry_run() {
            audit.log_folder_create(path.as_str(), provider.provider(), account_id.as_str()).await;
            report.folders_created += 1;
            continue;
        }

        match provider.create_folder(&path).await {
            Ok(()) => {
                audit.log_folder_create(path.as_str(), provider.provider(), account_id.as_str()).await;
                report.folders_created += 1;
                info!(path = %path, account = %account_id, "mirrored empty folder");
            }
            Err(e) => {
                if stop_on_error {
                    return Err(e.into());
                }
                report.failures.push(e.to_string());
            }
        }
    }

    Ok(report)
}
