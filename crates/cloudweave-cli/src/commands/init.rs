//! `cloudweave init` — lays down a fresh config directory
//!
//! Writes a default `config.yaml` if one isn't already there, opens (and so
//! creates) the encrypted metadata store, and opens the secrets envelope so
//! its `.salt` sidecar exists before an operator edits it by hand. Does not
//! provision any account credentials; see [`crate::secrets`].

use anyhow::Context as _;
use clap::Args;

use cloudweave_core::config::Config;
use cloudweave_store::EncryptedStore;

use crate::context::{read_passphrase, PASSPHRASE_ENV_VAR};
use crate::output::OutputFormatter;
use crate::secrets::Secrets;

#[derive(Debug, Args)]
pub struct InitCommand {
    /// Use an alternate config file path instead of the platform default.
    #[arg(long)]
    config: Option<String>,
}

impl InitCommand {
    pub async fn execute(&self, formatter: &dyn OutputFormatter) -> anyhow::Result<()> {
        let config_path = self.config.clone().map(std::path::PathBuf::from).unwrap_or_else(Config::default_path);
        let passphrase = read_passphrase().with_context(|| {
            format!("set {PASSPHRASE_ENV_VAR} before running init; it seeds both the store and the secrets envelope")
        })?;

        if config_path.exists() {
            formatter.info(&format!("config already exists at {}", config_path.display()));
        } else {
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let yaml = serde_yaml::to_string(&Config::default())?;
            std::fs::write(&config_path, yaml)?;
            formatter.success(&format!("wrote default config to {}", config_path.display()));
        }

        let store_path = Config::default_store_path();
        let store = EncryptedStore::open(&store_path, &passphrase)
            .await
            .with_context(|| format!("failed to initialize metadata store at {}", store_path.display()))?;
        store.seal().await?;
        formatter.success(&format!("initialized metadata store at {}", store_path.display()));

        let secrets_path = Config::default_secrets_path();
        if secrets_path.exists() {
            formatter.info(&format!("secrets envelope already exists at {}", secrets_path.display()));
        } else {
            Secrets::default().save(&secrets_path, &passphrase)?;
            formatter.success(&format!(
                "initialized empty secrets envelope at {}; add per-account credentials before running scan/sync",
                secrets_path.display()
            ));
        }

        Ok(())
    }
}
