//! Quota collection and overloaded/target classification (spec §4.5)
//!
//! Live quota is pulled from each provider and written back to the store so
//! `cloudweave status` always reports the last value seen by a capacity
//! pass, not just whatever the scanner happened to observe.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use cloudweave_core::config::CapacityConfig;
use cloudweave_core::domain::{AccountId, UserAccount};
use cloudweave_core::ports::{CloudProvider, MetadataStore};

use crate::error::CapacityError;

/// One account's live quota, snapshotted for one capacity pass.
///
/// `free_bytes` is tracked separately from `account.quota_used()` because
/// a rebalance loop debits it in memory as it plans moves, without writing
/// every intermediate value back to the store.
#[derive(Debug, Clone)]
pub struct AccountQuota {
    pub account: UserAccount,
    pub free_bytes: u64,
}

impl AccountQuota {
    #[must_use]
    pub fn from_account(account: UserAccount) -> Self {
        let free_bytes = account.quota_total().saturating_sub(account.quota_used());
        Self { account, free_bytes }
    }

    #[must_use]
    pub fn is_overloaded(&self, config: &CapacityConfig) -> bool {
        !self.account.provider().is_unlimited()
            && self.account.usage_ratio() * 100.0 >= f64::from(config.high_watermark_percent)
    }

    #[must_use]
    pub fn is_under_target(&self, config: &CapacityConfig) -> bool {
        self.account.provider().is_unlimited()
            || self.account.usage_ratio() * 100.0 < f64::from(config.target_watermark_percent)
    }
}

/// Refreshes every known account's quota from its live provider and
/// persists the result, returning the updated rows.
pub async fn refresh_quotas(
    store: &Arc<dyn MetadataStore>,
    providers: &HashMap<AccountId, Arc<dyn CloudProvider>>,
) -> Result<Vec<UserAccount>, CapacityError> {
    let mut updated = Vec::new();

    for mut account in store.list_accounts().await.map_err(CapacityError::Storage)? {
        let Some(provider) = providers.get(account.id()) else {
            debug!(account = %account.id(), "no live adapter for account, skipping quota refresh");
            updated.push(account);
            continue;
        };

        let quota = provider.quota().await.map_err(CapacityError::Storage)?;
        account.set_quota(quota.used_bytes, quota.total_bytes);
        store.upsert_account(&account).await.map_err(CapacityError::Storage)?;
        updated.push(account);
    }

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudweave_core::domain::{AccountRole, Provider};

    fn account(used: u64, total: u64, provider: Provider) -> UserAccount {
        let mut acc = UserAccount::new(AccountId::new("a1").unwrap(), provider, AccountRole::Main, "a");
        acc.set_quota(used, total);
        acc
    }

    fn config() -> CapacityConfig {
        CapacityConfig { high_watermark_percent: 95, target_watermark_percent: 90, max_consecutive_failures: 2 }
    }

    #[test]
    fn overloaded_at_or_above_high_watermark() {
        let q = AccountQuota::from_account(account(95, 100, Provider::Google));
        assert!(q.is_overloaded(&config()));
        assert_eq!(q.free_bytes, 5);
    }

    #[test]
    fn under_target_below_watermark() {
        let q = AccountQuota::from_account(account(80, 100, Provider::Google));
        assert!(q.is_under_target(&config()));
        assert!(!q.is_overloaded(&config()));
    }

    #[test]
    fn unlimited_provider_never_overloaded_always_under_target() {
        let q = AccountQuota::from_account(account(999, 0, Provider::Telegram));
        assert!(!q.is_overloaded(&config()));
        assert!(q.is_under_target(&config()));
    }
}
