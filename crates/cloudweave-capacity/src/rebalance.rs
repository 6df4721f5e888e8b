//! Per-provider rebalance and free-main loops (spec §4.5)
//!
//! Both loops share the same drain routine: walk a source account's files
//! largest-first, place each on the first target with enough room, and
//! stop moving files off a source once it falls below the target
//! watermark or the local failure counter trips.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use cloudweave_core::config::CapacityConfig;
use cloudweave_core::domain::{AccountId, AccountRole, Provider};
use cloudweave_core::ports::{CloudProvider, MetadataStore, ReplicaFilter};

use crate::error::CapacityError;
use crate::quota::{refresh_quotas, AccountQuota};
use crate::transfer::transfer_or_copy;

/// Outcome of one rebalance, free-main, or full `run` pass.
#[derive(Debug, Default, Clone)]
pub struct RebalanceReport {
    pub files_moved: u64,
    pub bytes_moved: u64,
    pub sources_stopped: Vec<AccountId>,
    pub failures: Vec<String>,
}

impl RebalanceReport {
    fn merge(&mut self, other: RebalanceReport) {
        self.files_moved += other.files_moved;
        self.bytes_moved += other.bytes_moved;
        self.sources_stopped.extend(other.sources_stopped);
        self.failures.extend(other.failures);
    }
}

/// One account being drained, tracked with an in-memory estimate of its
/// remaining usage so the loop doesn't need to round-trip the store (or a
/// fresh `quota()` call) after every single move.
struct DrainSource {
    quota: AccountQuota,
    used_estimate: u64,
    consecutive_failures: u32,
}

pub struct CapacityEngine {
    store: Arc<dyn MetadataStore>,
    providers: HashMap<AccountId, Arc<dyn CloudProvider>>,
    config: CapacityConfig,
}

impl CapacityEngine {
    #[must_use]
    pub fn new(
        store: Arc<dyn MetadataStore>,
        providers: HashMap<AccountId, Arc<dyn CloudProvider>>,
        config: CapacityConfig,
    ) -> Self {
        Self { store, providers, config }
    }

    /// Refreshes quotas, then runs free-main followed by rebalance for
    /// every provider in priority order.
    pub async fn run(&self) -> Result<RebalanceReport, CapacityError> {
        refresh_quotas(&self.store, &self.providers).await?;

        let mut report = RebalanceReport::default();
        for provider in Provider::ALL_BY_PRIORITY {
            report.merge(self.free_main(provider).await?);
            report.merge(self.rebalance(provider).await?);
        }

        info!(
            files_moved = report.files_moved,
            bytes_moved = report.bytes_moved,
            stopped = report.sources_stopped.len(),
            failures = report.failures.len(),
            "Capacity pass complete"
        );

        Ok(report)
    }

    /// Drains the main account of `provider` onto its backups when it is
    /// overloaded. Fails up (no moves attempted) if total backup free
    /// space can't possibly cover the main account's current usage.
    pub async fn free_main(&self, provider: Provider) -> Result<RebalanceReport, CapacityError> {
        let mut report = RebalanceReport::default();
        let accounts = self.store.list_accounts_by_provider(provider).await.map_err(CapacityError::Storage)?;

        let Some(main) = accounts.iter().find(|a| a.is_main()).cloned() else {
            return Ok(report);
        };
        let main_quota = AccountQuota::from_account(main);
        if !main_quota.is_overloaded(&self.config) {
            return Ok(report);
        }

        let backups: Vec<AccountQuota> = accounts
            .into_iter()
            .filter(|a| a.role() == AccountRole::Backup)
            .map(AccountQuota::from_account)
            .collect();

        let total_backup_free: u64 = backups.iter().map(|b| b.free_bytes).sum();
        if total_backup_free < main_quota.account.quota_used() {
            warn!(
                provider = %provider,
                free = total_backup_free,
                owned = main_quota.account.quota_used(),
                "free-main aborted: backup accounts do not have enough combined free space"
            );
            report.failures.push(format!(
                "{provider}: insufficient backup capacity to free main ({total_backup_free} free, {owned} owned)",
                owned = main_quota.account.quota_used()
            ));
            return Ok(report);
        }

        self.drain(vec![main_quota], backups, &mut report).await?;
        Ok(report)
    }

    /// Evens out the backup accounts of `provider`: overloaded backups
    /// drain onto non-overloaded backups with free space.
    pub async fn rebalance(&self, provider: Provider) -> Result<RebalanceReport, CapacityError> {
        let mut report = RebalanceReport::default();
        let quotas: Vec<AccountQuota> = self
            .store
            .list_accounts_by_provider(provider)
            .await
            .map_err(CapacityError::Storage)?
            .into_iter()
            .filter(|a| a.role() == AccountRole::Backup)
            .map(AccountQuota::from_account)
            .collect();

        let sources: Vec<AccountQuota> =
            quotas.iter().filter(|q| q.is_overloaded(&self.config)).cloned().collect();
        let targets: Vec<AccountQuota> = quotas
            .into_iter()
            .filter(|q| !q.is_overloaded(&self.config) && q.free_bytes > 0)
            .collect();

        self.drain(sources, targets, &mut report).await?;
        Ok(report)
    }

    async fn drain(
        &self,
        sources: Vec<AccountQuota>,
        targets: Vec<AccountQuota>,
        report: &mut RebalanceReport,
    ) -> Result<(), CapacityError> {
        let mut targets: Vec<AccountQuota> = targets;
        targets.sort_by(|a, b| b.free_bytes.cmp(&a.free_bytes));

        for quota in sources {
            let mut source = DrainSource {
                used_estimate: quota.account.quota_used(),
                quota,
                consecutive_failures: 0,
            };

            let mut replicas = self
                .store
                .list_replicas(&ReplicaFilter::new().with_account_id(source.quota.account.id().clone()))
                .await
                .map_err(CapacityError::Storage)?;
            replicas.sort_by(|a, b| b.size().cmp(&a.size()));

            for replica in &replicas {
                let total = source.quota.account.quota_total();
                let ratio = if total == 0 { 0.0 } else { source.used_estimate as f64 / total as f64 * 100.0 };
                if ratio < f64::from(self.config.target_watermark_percent) {
                    break;
                }

                let Some(idx) = targets.iter().position(|t| t.free_bytes >= replica.size()) else {
                    continue;
                };
                let dst = targets[idx].account.id().clone();

                match transfer_or_copy(&self.store, &self.providers, replica, &dst).await {
                    Ok(_) => {
                        source.consecutive_failures = 0;
                        source.used_estimate = source.used_estimate.saturating_sub(replica.size());
                        targets[idx].free_bytes = targets[idx].free_bytes.saturating_sub(replica.size());
                        targets.sort_by(|a, b| b.free_bytes.cmp(&a.free_bytes));
                        report.files_moved += 1;
                        report.bytes_moved += replica.size();
                    }
                    Err(e) => {
                        source.consecutive_failures += 1;
                        report.failures.push(e.to_string());
                        if source.consecutive_failures >= self.config.max_consecutive_failures {
                            warn!(
                                account = %source.quota.account.id(),
                                "dropping source after consecutive transfer failures"
                            );
                            report.sources_stopped.push(source.quota.account.id().clone());
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }
}
