//! User account domain entity
//!
//! A [`UserAccount`] is one authenticated identity on one [`Provider`] —
//! a Google account, a Microsoft account, or a Telegram user session whose
//! channel backs the Telegram "drive".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::AccountId;
use super::provider::Provider;

/// Current reachability of an account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountState {
    /// Reachable and authorized.
    #[default]
    Active,
    /// OAuth/session token expired, needs refresh before use.
    TokenExpired,
    /// Provider suspended or revoked the account.
    Suspended,
    /// In an error state with a description.
    Error(String),
}

impl AccountState {
    #[must_use]
    pub fn can_sync(&self) -> bool {
        matches!(self, AccountState::Active)
    }

    #[must_use]
    pub fn needs_token_refresh(&self) -> bool {
        matches!(self, AccountState::TokenExpired)
    }
}

impl std::fmt::Display for AccountState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountState::Active => write!(f, "active"),
            AccountState::TokenExpired => write!(f, "token_expired"),
            AccountState::Suspended => write!(f, "suspended"),
            AccountState::Error(msg) => write!(f, "error: {msg}"),
        }
    }
}

/// Whether an account is the primary drive for its provider or a backup
/// target used only when the main account runs short on space (§5).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    #[default]
    Main,
    Backup,
}

impl std::fmt::Display for AccountRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountRole::Main => write!(f, "main"),
            AccountRole::Backup => write!(f, "backup"),
        }
    }
}

/// One authenticated identity on one provider
///
/// Credential material itself (OAuth refresh tokens, Telegram session
/// bytes) is not stored on this entity; it lives encrypted in
/// `config.json.enc` and is loaded by the adapter layer keyed by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    id: AccountId,
    provider: Provider,
    role: AccountRole,
    display_name: String,
    quota_used: u64,
    quota_total: u64,
    state: AccountState,
    created_at: DateTime<Utc>,
}

impl UserAccount {
    #[must_use]
    pub fn new(
        id: AccountId,
        provider: Provider,
        role: AccountRole,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            provider,
            role,
            display_name: display_name.into(),
            quota_used: 0,
            quota_total: 0,
            state: AccountState::Active,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: AccountId,
        provider: Provider,
        role: AccountRole,
        display_name: String,
        quota_used: u64,
        quota_total: u64,
        state: AccountState,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            provider,
            role,
            display_name,
            quota_used,
            quota_total,
            state,
            created_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> &AccountId {
        &self.id
    }

    #[must_use]
    pub fn provider(&self) -> Provider {
        self.provider
    }

    #[must_use]
    pub fn role(&self) -> AccountRole {
        self.role
    }

    #[must_use]
    pub fn is_main(&self) -> bool {
        matches!(self.role, AccountRole::Main)
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub fn quota_used(&self) -> u64 {
        self.quota_used
    }

    #[must_use]
    pub fn quota_total(&self) -> u64 {
        self.quota_total
    }

    pub fn set_quota(&mut self, used: u64, total: u64) {
        self.quota_used = used;
        self.quota_total = total;
    }

    /// Fraction of quota consumed, in `[0.0, 1.0]`. Unlimited providers
    /// ([`Provider::is_unlimited`]) always report `0.0`.
    #[must_use]
    pub fn usage_ratio(&self) -> f64 {
        if self.provider.is_unlimited() || self.quota_total == 0 {
            return 0.0;
        }
        self.quota_used as f64 / self.quota_total as f64
    }

    #[must_use]
    pub fn state(&self) -> &AccountState {
        &self.state
    }

    pub fn set_state(&mut self, state: AccountState) {
        self.state = state;
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(used: u64, total: u64, provider: Provider) -> UserAccount {
        let mut acc = UserAccount::new(
            AccountId::new("acct-1").unwrap(),
            provider,
            AccountRole::Main,
            "Test Account",
        );
        acc.set_quota(used, total);
        acc
    }

    #[test]
    fn usage_ratio_computes_fraction() {
        let acc = account(90, 100, Provider::Google);
        assert!((acc.usage_ratio() - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn unlimited_provider_always_reports_zero_usage() {
        let acc = account(90, 100, Provider::Telegram);
        assert_eq!(acc.usage_ratio(), 0.0);
    }

    #[test]
    fn zero_quota_total_does_not_divide_by_zero() {
        let acc = account(0, 0, Provider::Microsoft);
        assert_eq!(acc.usage_ratio(), 0.0);
    }
}
