//! OAuth2 refresh-token exchange shared by the Google and Microsoft adapters
//!
//! The interactive authorization-code/PKCE flow is out of scope here (§0
//! non-goals: provisioning new accounts is an operator task); both adapters
//! are handed an already-issued refresh token at construction and use this
//! module only to exchange it for a short-lived access token, keeping that
//! access token refreshed for the life of the process.

use std::sync::Arc;

use anyhow::{Context, Result};
use oauth2::basic::BasicClient;
use oauth2::{AuthUrl, ClientId, RefreshToken, TokenResponse, TokenUrl};
use tokio::sync::RwLock;

/// A refresh-token-backed access token that re-exchanges itself on demand.
///
/// Holds the current access token behind an `RwLock` so multiple concurrent
/// requests can read it without serializing on a refresh that isn't
/// happening; a refresh takes the write lock only for the duration of the
/// token exchange call.
pub struct RefreshingToken {
    client: BasicClient,
    refresh_token: RefreshToken,
    access_token: RwLock<String>,
}

impl RefreshingToken {
    /// Builds a client bound to `auth_url`/`token_url` and performs an
    /// initial exchange so the first caller doesn't pay the refresh latency.
    pub async fn new(client_id: &str, auth_url: &str, token_url: &str, refresh_token: &str) -> Result<Arc<Self>> {
        let client = BasicClient::new(ClientId::new(client_id.to_string()))
            .set_auth_uri(AuthUrl::new(auth_url.to_string()).context("invalid auth url")?)
            .set_token_uri(TokenUrl::new(token_url.to_string()).context("invalid token url")?);

        let refresh_token = RefreshToken::new(refresh_token.to_string());
        let access_token = Self::exchange(&client, &refresh_token).await?;

        Ok(Arc::new(Self {
            client,
            refresh_token,
            access_token: RwLock::new(access_token),
        }))
    }

    async fn exchange(client: &BasicClient, refresh_token: &RefreshToken) -> Result<String> {
        let http_client = reqwest::Client::new();
        let response = client
            .exchange_refresh_token(refresh_token)
            .request_async(&http_client)
            .await
            .context("refresh token exchange failed")?;
        Ok(response.access_token().secret().clone())
    }

    /// Current access token, refreshing first if the caller knows it has
    /// expired (the adapters call this after a provider returns 401).
    pub async fn access_token(&self) -> String {
        self.access_token.read().await.clone()
    }

    /// Forces a fresh exchange and updates the cached access token.
    pub async fn refresh(&self) -> Result<String> {
        let token = Self::exchange(&self.client, &self.refresh_token).await?;
        *self.access_token.write().await = token.clone();
        Ok(token)
    }
}
