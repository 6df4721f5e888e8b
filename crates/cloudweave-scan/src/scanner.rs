//! Parallel fan-out scan of every configured account (spec §4.3)
//!
//! One `tokio::task` per account, joined via a `JoinSet`; each task walks
//! its provider's whole tree (`CloudProvider::list_changes`, no delta
//! cursor in this design) and pushes entries onto one of two bounded
//! `mpsc` queues. A single writer task drains both queues, batching rows
//! into the metadata store, flushing on `scan_batch_size` or a 2-second
//! idle timer — the same shape as `cloudweave-sync`'s watcher debouncing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use cloudweave_core::config::ScanConfig;
use cloudweave_core::domain::{AccountId, Folder, LogicalFileId, Provider, Replica};
use cloudweave_core::ports::{CloudProvider, MetadataStore, RemoteEntry};

use crate::error::ScanError;

/// The sentinel carried by every replica the scanner writes: it has not
/// yet been linked to a logical file by the reconciler.
fn orphan_logical_file_id() -> LogicalFileId {
    LogicalFileId::from_uuid(uuid::Uuid::nil())
}

const METADATA_DB_FILE_NAME: &str = "metadata.db";

/// True for entries the scan pass must never persist: the metadata store
/// file itself, replicated to the aux folder out of band (spec §6).
#[must_use]
pub fn is_scan_ignored(entry: &RemoteEntry) -> bool {
    entry.name == METADATA_DB_FILE_NAME
}

/// Outcome of one call to [`Scanner::scan_all`].
#[derive(Debug, Default, Clone)]
pub struct ScanReport {
    pub accounts_scanned: usize,
    pub files_written: u64,
    pub folders_written: u64,
    pub account_failures: Vec<String>,
}

/// Fans out `list_changes` across every account and writes the results.
pub struct Scanner {
    providers: HashMap<AccountId, Arc<dyn CloudProvider>>,
    store: Arc<dyn MetadataStore>,
    config: ScanConfig,
}

impl Scanner {
    #[must_use]
    pub fn new(
        providers: HashMap<AccountId, Arc<dyn CloudProvider>>,
        store: Arc<dyn MetadataStore>,
        config: ScanConfig,
    ) -> Self {
        Self { providers, store, config }
    }

    /// Runs one full scan pass: fan out, batched writes, drain.
    ///
    /// Does not run the reconcile pipeline; call
    /// [`crate::reconciler::Reconciler`] afterwards with the same `T0`
    /// this method's caller captured before invoking it.
    pub async fn scan_all(&self) -> ScanReport {
        let (file_tx, file_rx) = mpsc::channel::<Replica>(1000);
        let (folder_tx, folder_rx) = mpsc::channel::<Folder>(1000);

        let writer = tokio::spawn(run_writer(
            file_rx,
            folder_rx,
            self.store.clone(),
            self.config.batch_size,
            Duration::from_secs(self.config.flush_interval_seconds),
        ));

        let mut tasks = JoinSet::new();
        for (account_id, provider) in &self.providers {
            tasks.spawn(scan_account(
                account_id.clone(),
                provider.clone(),
                file_tx.clone(),
                folder_tx.clone(),
            ));
        }
        drop(file_tx);
        drop(folder_tx);

        let mut report = ScanReport { accounts_scanned: self.providers.len(), ..Default::default() };

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(error = %e, "account scan failed, continuing with the rest");
                    report.account_failures.push(e.to_string());
                }
                Err(join_err) => {
                    warn!(error = %join_err, "account scan task panicked");
                    report.account_failures.push(join_err.to_string());
                }
            }
        }

        match writer.await {
            Ok(Ok(stats)) => {
                report.files_written = stats.files;
                report.folders_written = stats.folders;
            }
            Ok(Err(e)) => warn!(error = %e, "writer task failed to flush remaining rows"),
            Err(join_err) => warn!(error = %join_err, "writer task panicked"),
        }

        info!(
            accounts = report.accounts_scanned,
            files = report.files_written,
            folders = report.folders_written,
            failures = report.account_failures.len(),
            "Scan pass complete"
        );

        report
    }
}

async fn scan_account(
    account_id: AccountId,
    provider: Arc<dyn CloudProvider>,
    file_tx: mpsc::Sender<Replica>,
    folder_tx: mpsc::Sender<Folder>,
) -> Result<(), ScanError> {
    debug!(account = %account_id, "Scanning account");

    let entries = provider.list_changes().await.map_err(|e| ScanError::AccountScanFailed {
        account: account_id.to_string(),
        source: e,
    })?;

    for entry in entries {
        if is_scan_ignored(&entry) || entry.is_deleted {
            continue;
        }

        if entry.is_folder {
            let folder = Folder::new(account_id.clone(), provider.provider(), entry.native_id, entry.path);
            if folder_tx.send(folder).await.is_err() {
                break;
            }
        } else {
            let replica = Replica::new(
                orphan_logical_file_id(),
                account_id.clone(),
                provider.provider(),
                entry.native_id,
                entry.hash,
                entry.path,
                entry.size,
                entry.modified,
            );
            if file_tx.send(replica).await.is_err() {
                break;
            }
        }
    }

    Ok(())
}

#[derive(Debug, Default)]
struct WriterStats {
    files: u64,
    folders: u64,
}

async fn run_writer(
    mut file_rx: mpsc::Receiver<Replica>,
    mut folder_rx: mpsc::Receiver<Folder>,
    store: Arc<dyn MetadataStore>,
    batch_size: usize,
    flush_interval: Duration,
) -> anyhow::Result<WriterStats> {
    let mut file_buf: Vec<Replica> = Vec::with_capacity(batch_size);
    let mut folder_buf: Vec<Folder> = Vec::with_capacity(batch_size);
    let mut stats = WriterStats::default();

    let mut idle = tokio::time::interval(flush_interval);
    idle.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    idle.tick().await; // first tick fires immediately; consume it up front

    let mut files_done = false;
    let mut folders_done = false;

    while !(files_done && folders_done) {
        tokio::select! {
            item = file_rx.recv(), if !files_done => {
                match item {
                    Some(replica) => {
                        file_buf.push(replica);
                        if file_buf.len() >= batch_size {
                            stats.files += flush_files(&store, &mut file_buf).await?;
                        }
                    }
                    None => files_done = true,
                }
            }
            item = folder_rx.recv(), if !folders_done => {
                match item {
                    Some(folder) => {
                        folder_buf.push(folder);
                        if folder_buf.len() >= batch_size {
                            stats.folders += flush_folders(&store, &mut folder_buf).await?;
                        }
                    }
                    None => folders_done = true,
                }
            }
            _ = idle.tick() => {
                stats.files += flush_files(&store, &mut file_buf).await?;
                stats.folders += flush_folders(&store, &mut folder_buf).await?;
            }
        }
    }

    stats.files += flush_files(&store, &mut file_buf).await?;
    stats.folders += flush_folders(&store, &mut folder_buf).await?;

    Ok(stats)
}

async fn flush_files(store: &Arc<dyn MetadataStore>, buf: &mut Vec<Replica>) -> anyhow::Result<u64> {
    if buf.is_empty() {
        return Ok(0);
    }
    store.batch_upsert_replicas(buf).await?;
    let n = buf.len() as u64;
    buf.clear();
    Ok(n)
}

async fn flush_folders(store: &Arc<dyn MetadataStore>, buf: &mut Vec<Folder>) -> anyhow::Result<u64> {
    if buf.is_empty() {
        return Ok(0);
    }
    for folder in buf.iter() {
        store.upsert_folder(folder).await?;
    }
    let n = buf.len() as u64;
    buf.clear();
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudweave_core::domain::{NativeId, SyncPath};
    use chrono::Utc;

    fn entry(name: &str, is_folder: bool, is_deleted: bool) -> RemoteEntry {
        RemoteEntry {
            native_id: NativeId::new("n1").unwrap(),
            parent_native_id: None,
            name: name.to_string(),
            path: SyncPath::new(name).unwrap(),
            size: 10,
            hash: None,
            modified: Utc::now(),
            is_folder,
            is_deleted,
        }
    }

    #[test]
    fn ignores_metadata_db_by_name() {
        assert!(is_scan_ignored(&entry("metadata.db", false, false)));
        assert!(!is_scan_ignored(&entry("notes.txt", false, false)));
    }

    #[test]
    fn orphan_sentinel_is_nil_uuid() {
        assert!(orphan_logical_file_id().as_uuid().is_nil());
    }
}
