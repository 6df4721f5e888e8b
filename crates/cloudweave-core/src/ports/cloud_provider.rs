//! Cloud provider port (driven/secondary port)
//!
//! One trait implemented three times — Google, Microsoft, Telegram — so the
//! scanner, sync engine, and capacity engine never branch on provider
//! identity themselves. Differences in capability surface as data
//! ([`TransferOutcome`]) rather than as different trait shapes.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at the port boundary are
//!   adapter-specific; the engines only need to know whether an operation
//!   succeeded, not which HTTP client raised the error.
//! - `upload` takes an `AsyncRead` so the Telegram adapter can split the
//!   stream into fragments without buffering the whole file, and so the
//!   cross-provider copy path (store-side duplex pipe) never needs to know
//!   which provider it is feeding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;

use crate::domain::{NativeHash, NativeId, Provider, SyncPath, TransferOutcome};

/// One entry returned by [`CloudProvider::list_changes`]
///
/// A port-level DTO, not a domain entity; the scanner maps it onto
/// [`crate::domain::Replica`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub native_id: NativeId,
    pub parent_native_id: Option<NativeId>,
    pub name: String,
    pub path: SyncPath,
    pub size: u64,
    pub hash: Option<NativeHash>,
    pub modified: DateTime<Utc>,
    pub is_folder: bool,
    pub is_deleted: bool,
}

/// Storage quota for one account
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QuotaInfo {
    pub used_bytes: u64,
    pub total_bytes: u64,
}

/// Port trait for cloud storage provider operations
///
/// Implementations handle the provider-specific API calls, authentication,
/// rate limiting, and error mapping; retry-with-backoff is expected to be
/// applied internally (or via a shared wrapper) rather than by callers.
#[async_trait::async_trait]
pub trait CloudProvider: Send + Sync {
    /// Which provider this adapter implements.
    fn provider(&self) -> Provider;

    /// Locates this account's root sync folder (`synched-cloud-drives`),
    /// creating it at the drive root if none exists. Returns
    /// `ProviderError::Ambiguity` (wrapped in the `anyhow::Error`) if more
    /// than one candidate is found; if exactly one is found but it doesn't
    /// live at the drive root, relocates it there before returning its id.
    async fn preflight(&self) -> anyhow::Result<NativeId>;

    /// Lists every file and folder reachable from the sync root, including
    /// items under `sync-cloud-drives-aux/` (scanner walks the whole tree
    /// every run; there is no delta cursor in this design — see spec §4.3).
    async fn list_changes(&self) -> anyhow::Result<Vec<RemoteEntry>>;

    /// Downloads a file's content as a stream.
    async fn download(&self, native_id: &NativeId) -> anyhow::Result<Box<dyn AsyncRead + Send + Unpin>>;

    /// Exports a provider-native document with no raw byte representation
    /// of its own (Google Docs/Sheets/Slides) as `mime`, so the scanner can
    /// hash the exported bytes in place of a content hash the provider
    /// never supplies. Providers without such formats just forward to
    /// [`CloudProvider::download`].
    async fn export(&self, native_id: &NativeId, mime: &str) -> anyhow::Result<Box<dyn AsyncRead + Send + Unpin>> {
        let _ = mime;
        self.download(native_id).await
    }

    /// Uploads content to `parent` under `name`, streaming from `data`
    /// rather than requiring the whole file in memory.
    async fn upload(
        &self,
        parent: &SyncPath,
        name: &str,
        size: u64,
        data: Box<dyn AsyncRead + Send + Unpin>,
    ) -> anyhow::Result<RemoteEntry>;

    /// Creates a folder at `path` if the provider has native folders
    /// ([`Provider::has_native_folders`]); a no-op `Ok` for Telegram.
    async fn create_folder(&self, path: &SyncPath) -> anyhow::Result<()>;

    /// Moves `native_id` to `destination`, used for soft-delete relocation
    /// under `sync-cloud-drives-aux/soft-deleted/`.
    async fn move_item(&self, native_id: &NativeId, destination: &SyncPath) -> anyhow::Result<()>;

    /// Permanently deletes an item (hard delete, I4).
    async fn delete(&self, native_id: &NativeId) -> anyhow::Result<()>;

    /// Converges `native_id` to this provider's representation of "gone"
    /// for the reconciler's hard-delete propagation (I4) and the sync
    /// engine's soft-delete propagation (I3). Defaults to [`delete`];
    /// Telegram overrides this to edit the message caption's status
    /// instead of physically deleting it.
    ///
    /// [`delete`]: CloudProvider::delete
    async fn mark_deleted(&self, native_id: &NativeId) -> anyhow::Result<()> {
        self.delete(native_id).await
    }

    /// Grants `account` write access to the folder at `folder_id`. Treats
    /// an already-shared folder as success rather than an error.
    async fn share_folder(&self, folder_id: &NativeId, account: &str) -> anyhow::Result<()>;

    /// Returns whether `account` currently holds access to `folder_id`.
    async fn check_share(&self, folder_id: &NativeId, account: &str) -> anyhow::Result<bool>;

    /// Current storage quota for this account.
    async fn quota(&self) -> anyhow::Result<QuotaInfo>;

    /// Attempts to hand ownership of `native_id` to `recipient_account_id`
    /// without moving bytes off this provider (§4.5). Returns
    /// [`TransferOutcome::Unsupported`] for providers with no such API
    /// (Microsoft).
    async fn transfer_ownership(
        &self,
        native_id: &NativeId,
        recipient_account_id: &str,
    ) -> anyhow::Result<TransferOutcome>;

    /// Completes a [`TransferOutcome::Pending`] transfer from the
    /// recipient's side.
    async fn accept_pending_ownership(&self, native_id: &NativeId) -> anyhow::Result<()>;
}
