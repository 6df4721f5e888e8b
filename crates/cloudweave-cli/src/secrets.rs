//! Per-account credential envelope
//!
//! Account provisioning (the OAuth browser flow, the Telegram login
//! handshake, the interactive passphrase prompt) is out of scope here — an
//! operator obtains these credentials out of band and drops them into the
//! encrypted envelope at [`cloudweave_core::config::Config::default_secrets_path`].
//! This module only reads that envelope and turns its entries into live
//! [`CloudProvider`] adapters, the way `cloudweave-providers::auth` accepts
//! an already-issued refresh token rather than running the exchange itself.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use cloudweave_core::config::RateLimitingConfig;
use cloudweave_core::domain::{AccountId, NativeId, UserAccount};
use cloudweave_core::ports::CloudProvider;
use cloudweave_providers::auth::RefreshingToken;
use cloudweave_providers::google::GoogleProvider;
use cloudweave_providers::microsoft::MicrosoftProvider;
use cloudweave_providers::telegram::TelegramProvider;
use cloudweave_crypto::Vault;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const MICROSOFT_AUTH_URL: &str = "https://login.microsoftonline.com/common/oauth2/v2.0/authorize";
const MICROSOFT_TOKEN_URL: &str = "https://login.microsoftonline.com/common/oauth2/v2.0/token";

/// One account's already-obtained credential material.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum Credential {
    Google {
        refresh_token: String,
        client_id: String,
        root_folder_id: String,
    },
    Microsoft {
        refresh_token: String,
        client_id: String,
    },
    Telegram {
        session_path: PathBuf,
        api_id: i32,
        api_hash: String,
        channel_username: String,
    },
}

/// The decrypted contents of the secrets envelope: one [`Credential`] per
/// [`AccountId`] known to the metadata store.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Secrets {
    pub accounts: HashMap<String, Credential>,
}

impl Secrets {
    /// Decrypts and parses the envelope at `path`, or returns an empty set
    /// if it doesn't exist yet (a freshly-initialized workspace has none).
    pub fn load(path: &std::path::Path, passphrase: &[u8]) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let vault = Vault::open(path, passphrase).context("failed to open secrets envelope")?;
        let plaintext = vault.decrypt_file(path).context("failed to decrypt secrets envelope")?;
        let secrets: Self =
            serde_json::from_slice(&plaintext).context("secrets envelope is not valid JSON")?;
        Ok(secrets)
    }

    /// Encrypts and writes `self` to `path`, creating the salt file beside
    /// it on first use.
    pub fn save(&self, path: &std::path::Path, passphrase: &[u8]) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let vault = Vault::open(path, passphrase).context("failed to open secrets envelope")?;
        let plaintext = serde_json::to_vec_pretty(self)?;
        vault.encrypt_file(path, &plaintext).context("failed to write secrets envelope")?;
        Ok(())
    }
}

/// Builds a live [`CloudProvider`] adapter for every account present in
/// both the store and the secrets envelope. Accounts with no matching
/// credential entry are skipped with a warning rather than failing the
/// whole call — operators provision accounts one at a time.
pub async fn build_providers(
    accounts: &[UserAccount],
    secrets: &Secrets,
    rate_limiting: &RateLimitingConfig,
) -> anyhow::Result<HashMap<AccountId, Arc<dyn CloudProvider>>> {
    let mut providers: HashMap<AccountId, Arc<dyn CloudProvider>> = HashMap::new();

    for account in accounts {
        let Some(credential) = secrets.accounts.get(account.id().as_str()) else {
            tracing::warn!(account = %account.id(), "no credential in secrets envelope, skipping");
            continue;
        };

        let provider: Arc<dyn CloudProvider> = match credential {
            Credential::Google { refresh_token, client_id, root_folder_id } => {
                let token =
                    RefreshingToken::new(client_id, GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL, refresh_token)
                        .await
                        .with_context(|| format!("failed to exchange Google refresh token for {}", account.id()))?;
                let root_folder_id = NativeId::new(root_folder_id.clone())?;
                Arc::new(GoogleProvider::new(token, root_folder_id, rate_limiting.google_requests_per_second))
            }
            Credential::Microsoft { refresh_token, client_id } => {
                let token = RefreshingToken::new(
                    client_id,
                    MICROSOFT_AUTH_URL,
                    MICROSOFT_TOKEN_URL,
                    refresh_token,
                )
                .await
                .with_context(|| format!("failed to exchange Microsoft refresh token for {}", account.id()))?;
                Arc::new(MicrosoftProvider::new(token, rate_limiting.microsoft_requests_per_second))
            }
            Credential::Telegram { session_path, api_id, api_hash, channel_username } => {
                let session = grammers_session::Session::load_file_or_create(session_path)
                    .with_context(|| format!("failed to load Telegram session for {}", account.id()))?;
                let client = grammers_client::Client::connect(grammers_client::Config {
                    session,
                    api_id: *api_id,
                    api_hash: api_hash.clone(),
                    params: grammers_client::InitParams::default(),
                })
                .await
                .with_context(|| format!("failed to connect Telegram client for {}", account.id()))?;
                Arc::new(
                    TelegramProvider::new(client, channel_username)
                        .await
                        .with_context(|| format!("failed to resolve Telegram channel for {}", account.id()))?,
                )
            }
        };

        providers.insert(account.id().clone(), provider);
    }

    Ok(providers)
}
