//! Shared setup every subcommand but `init` needs: load the operational
//! config, open the encrypted metadata store, decrypt the secrets
//! envelope, and build live provider adapters for every known account.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;

use cloudweave_core::config::Config;
use cloudweave_core::domain::{AccountId, UserAccount};
use cloudweave_core::ports::{CloudProvider, MetadataStore};
use cloudweave_store::{EncryptedStore, SqliteMetadataStore};

use crate::secrets::{self, Secrets};

/// Name of the environment variable holding the passphrase for both the
/// metadata store and the secrets envelope. There is no interactive
/// prompt; provisioning credentials is an operator task out of scope here.
pub const PASSPHRASE_ENV_VAR: &str = "CLOUDWEAVE_PASSPHRASE";

pub fn read_passphrase() -> anyhow::Result<Vec<u8>> {
    std::env::var(PASSPHRASE_ENV_VAR)
        .map(String::into_bytes)
        .with_context(|| format!("{PASSPHRASE_ENV_VAR} must be set; no interactive prompt is supported"))
}

/// Everything a subcommand needs to touch the store and the providers.
pub struct Context {
    pub config: Config,
    pub store: EncryptedStore,
    pub metadata: Arc<dyn MetadataStore>,
    pub secrets_path: PathBuf,
    pub secrets: Secrets,
}

impl Context {
    pub async fn load(config_path: Option<String>) -> anyhow::Result<Self> {
        let config_path = config_path.map(PathBuf::from).unwrap_or_else(Config::default_path);
        let config = Config::load_or_default(&config_path);

        let passphrase = read_passphrase()?;
        let store_path = Config::default_store_path();
        let store = EncryptedStore::open(&store_path, &passphrase)
            .await
            .with_context(|| format!("failed to open metadata store at {}", store_path.display()))?;
        let metadata: Arc<dyn MetadataStore> = Arc::new(SqliteMetadataStore::new(store.pool().clone()));

        let secrets_path = Config::default_secrets_path();
        let secrets = Secrets::load(&secrets_path, &passphrase)?;

        Ok(Self { config, store, metadata, secrets_path, secrets })
    }

    pub async fn accounts(&self) -> anyhow::Result<Vec<UserAccount>> {
        self.metadata.list_accounts().await
    }

    /// Builds live provider adapters for every account with a matching
    /// secrets entry.
    pub async fn providers(&self) -> anyhow::Result<HashMap<AccountId, Arc<dyn CloudProvider>>> {
        let accounts = self.accounts().await?;
        secrets::build_providers(&accounts, &self.secrets, &self.config.rate_limiting).await
    }

    /// Seals the metadata store back to disk; call once at the end of a
    /// subcommand after any mutations.
    pub async fn seal(&self) -> anyhow::Result<()> {
        self.store.seal().await.context("failed to seal metadata store")
    }
}
