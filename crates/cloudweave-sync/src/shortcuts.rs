//! Cross-account Microsoft shortcuts (§4.4)
//!
//! When more than one Microsoft account is configured, every account that
//! doesn't hold a file's canonical replica needs visibility into it. The
//! port has no dedicated "create shortcut" primitive, so this is expressed
//! with the sharing primitives it does have: [`CloudProvider::share_folder`]
//! grants the other account access to the folder holding the canonical
//! replica, and [`CloudProvider::check_share`] makes the pass idempotent.
//! A failed `(holder, recipient)` pair is cached for the rest of this run
//! so a persistently broken pairing isn't retried file by file.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::warn;

use cloudweave_audit::AuditLogger;
use cloudweave_core::domain::{AccountId, FileStatus, Provider};
use cloudweave_core::ports::{CloudProvider, MetadataStore, ReplicaFilter};

use crate::error::SyncError;

/// Outcome of one [`create_shortcuts`] call.
#[derive(Debug, Default, Clone)]
pub struct ShortcutReport {
    pub shortcuts_created: u64,
    pub failures: Vec<String>,
}

/// Shares every active Microsoft replica's containing folder with every
/// other configured Microsoft account that doesn't already have access.
pub async fn create_shortcuts(
    store: &Arc<dyn MetadataStore>,
    providers: &HashMap<AccountId, Arc<dyn CloudProvider>>,
    audit: &AuditLogger,
    stop_on_error: bool,
) -> Result<ShortcutReport, SyncError> {
    let accounts = store.list_accounts_by_provider(Provider::Microsoft).await?;
    let mut report = ShortcutReport::default();
    if accounts.len() < 2 {
        return Ok(report);
    }

    let replicas = store
        .list_replicas(&ReplicaFilter::new().with_provider(Provider::Microsoft))
        .await?;

    let mut failed_pairs: HashSet<(AccountId, AccountId)> = HashSet::new();

    for replica in replicas.iter().filter(|r| r.status() == FileStatus::Active) {
        let Some(parent) = replica.path().parent() else { continue };
        let holder = replica.account_id();

        let Some(holder_provider) = providers.get(holder) else {
            let err = SyncError::UnknownAccount(holder.to_string());
            if stop_on_error {
                return Err(err);
            }
            report.failures.push(err.to_string());
            continue;
        };

        let folders = store.list_folders(holder).await?;
        let Some(folder) = folders.iter().find(|f| f.path() == &parent) else { continue };

        for account in &accounts {
            if account.id() == holder {
                continue;
            }
            let pair = (holder.clone(), account.id().clone());
            if failed_pairs.contains(&pair) {
                continue;
            }

            match holder_provider.check_share(folder.native_id(), account.id().as_str()).await {
                Ok(true) => continue,
                Ok(false) => {}
                Err(e) => {
                    warn!(holder = %holder, recipient = %account.id(), error = %e, "share check failed");
                    failed_pairs.insert(pair);
                    report.failures.push(e.to_string());
                    continue;
                }
            }

            if audit.is_dry_run() {
                audit
                    .log_microsoft_shortcut(replica.path().as_str(), holder.as_str(), account.id().as_str())
                    .await;
                report.shortcuts_created += 1;
                continue;
            }

            match holder_provider.share_folder(folder.native_id(), account.id().as_str()).await {
                Ok(()) => {
                    audit
                        .log_microsoft_shortcut(replica.path().as_str(), holder.as_str(), account.id().as_str())
                        .await;
                    report.shortcuts_created += 1;
                }
                Err(e) => {
                    if stop_on_error {
                        return Err(e.into());
                    }
                    failed_pairs.insert(pair);
                    report.failures.push(e.to_string());
                }
            }
        }
    }

    Ok(report)
}
