//! Google Drive adapter
//!
//! Talks to the Drive v3 REST API directly via `reqwest`, the same shape the
//! teacher's `GraphClient` uses for Microsoft Graph (bearer-auth request
//! builder, typed response structs, `execute_with_retry`-style wrapper
//! generalized into [`crate::error::with_retry`]).
//!
//! Google-specific quirks this adapter handles:
//! - Proprietary Google Docs/Sheets/Slides types report no native hash and
//!   have no raw bytes of their own; [`GoogleProvider::list_changes`] hashes
//!   their PDF export instead so they still participate in change detection.
//! - Ownership transfer (`transfer_ownership`) typically requires the
//!   recipient to accept ([`TransferOutcome::Pending`]); Workspace domain
//!   policy can also refuse it outright ([`TransferOutcome::ConsentRequired`]).

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use governor::{Quota, RateLimiter};
use serde::Deserialize;
use tokio::io::AsyncRead;
use tracing::debug;

use cloudweave_core::domain::{NativeHash, NativeId, Provider, SyncPath, TransferOutcome};
use cloudweave_core::ports::{QuotaInfo, RemoteEntry};

use crate::auth::RefreshingToken;
use crate::error::{with_retry, ProviderError};

const DRIVE_BASE_URL: &str = "https://www.googleapis.com/drive/v3";
const UPLOAD_BASE_URL: &str = "https://www.googleapis.com/upload/drive/v3";

/// MIME type Drive uses for folders.
const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Name of the account-level root sync folder located/created by `preflight`.
const SYNC_ROOT_FOLDER_NAME: &str = "synched-cloud-drives";

/// Export target used to hash proprietary Docs/Sheets/Slides files, which
/// report no native content hash of their own.
const PROPRIETARY_EXPORT_MIME: &str = "application/pdf";

fn is_proprietary_doc(mime_type: &str) -> bool {
    mime_type.starts_with("application/vnd.google-apps.") && mime_type != FOLDER_MIME_TYPE
}

fn sha256_hex(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

type GoogleLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

pub struct GoogleProvider {
    http: reqwest::Client,
    token: Arc<RefreshingToken>,
    limiter: GoogleLimiter,
    root_folder_id: NativeId,
    drive_base_url: String,
    upload_base_url: String,
}

impl GoogleProvider {
    /// `requests_per_second` comes from `CapacityConfig`/`RateLimitingConfig`
    /// (`google_requests_per_second`, default 5).
    #[must_use]
    pub fn new(token: Arc<RefreshingToken>, root_folder_id: NativeId, requests_per_second: u32) -> Self {
        Self::with_base_urls(token, root_folder_id, requests_per_second, DRIVE_BASE_URL, UPLOAD_BASE_URL)
    }

    /// Points the adapter at alternate base URLs; used in tests to target a
    /// wiremock server instead of the real Drive API.
    #[must_use]
    pub fn with_base_urls(
        token: Arc<RefreshingToken>,
        root_folder_id: NativeId,
        requests_per_second: u32,
        drive_base_url: impl Into<String>,
        upload_base_url: impl Into<String>,
    ) -> Self {
        let quota = Quota::per_second(requests_per_second.max(1).try_into().unwrap());
        Self {
            http: reqwest::Client::new(),
            token,
            limiter: RateLimiter::direct(quota),
            root_folder_id,
            drive_base_url: drive_base_url.into(),
            upload_base_url: upload_base_url.into(),
        }
    }

    async fn authed_request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.limiter.until_ready().await;
        let access_token = self.token.access_token().await;
        self.http.request(method, url).bearer_auth(access_token)
    }

    async fn export_bytes(&self, native_id: &NativeId, mime: &str) -> anyhow::Result<Vec<u8>> {
        use tokio::io::AsyncReadExt;

        let mut reader = self.export_stream(native_id, mime).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    async fn export_stream(&self, native_id: &NativeId, mime: &str) -> anyhow::Result<Box<dyn AsyncRead + Send + Unpin>> {
        let base = self.drive_base_url.as_str();
        let url = format!("{base}/files/{}/export", native_id.as_str());
        let response = self
            .authed_request(reqwest::Method::GET, &url)
            .await
            .query(&[("mimeType", mime)])
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &body).into());
        }
        let stream = response.bytes_stream();
        let reader = tokio_util::io::StreamReader::new(
            stream.map(|r| r.map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))),
        );
        Ok(Box::new(reader))
    }

    fn classify_status(status: reqwest::StatusCode, body: &str) -> ProviderError {
        match status.as_u16() {
            401 => ProviderError::Auth(body.to_string()),
            403 if body.contains("consent") => ProviderError::ConsentRequired(body.to_string()),
            403 if body.contains("storageQuotaExceeded") => ProviderError::QuotaExceeded(body.to_string()),
            403 => ProviderError::PermissionDenied(body.to_string()),
            404 => ProviderError::NotFound(body.to_string()),
            429 => ProviderError::RateLimit { retry_after: Duration::from_secs(2) },
            500..=599 => ProviderError::Transient(body.to_string()),
            _ => ProviderError::Other(anyhow::anyhow!("unexpected status {status}: {body}")),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DriveFileList {
    files: Vec<DriveFile>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    name: String,
    #[serde(rename = "mimeType")]
    mime_type: String,
    #[serde(default)]
    size: Option<String>,
    #[serde(rename = "md5Checksum")]
    md5_checksum: Option<String>,
    #[serde(rename = "modifiedTime")]
    modified_time: DateTime<Utc>,
    parents: Option<Vec<String>>,
    trashed: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct StorageQuota {
    #[serde(rename = "usageInDrive")]
    usage: Option<String>,
    limit: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AboutResponse {
    #[serde(rename = "storageQuota")]
    storage_quota: StorageQuota,
}

#[derive(Debug, Deserialize)]
struct PermissionResponse {
    id: String,
    #[serde(rename = "pendingOwner")]
    pending_owner: Option<bool>,
}

#[async_trait::async_trait]
impl cloudweave_core::ports::CloudProvider for GoogleProvider {
    fn provider(&self) -> Provider {
        Provider::Google
    }

    async fn preflight(&self) -> anyhow::Result<NativeId> {
        let base = self.drive_base_url.as_str();
        let query = format!("name='{SYNC_ROOT_FOLDER_NAME}' and mimeType='{FOLDER_MIME_TYPE}' and trashed=false");
        let url = format!("{base}/files?fields=files(id,name,parents)");
        let response = self
            .authed_request(reqwest::Method::GET, &url)
            .await
            .query(&[("q", query.as_str())])
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &body).into());
        }
        let found: DriveFileList = response.json().await?;

        match found.files.len() {
            0 => {
                let metadata = serde_json::json!({
                    "name": SYNC_ROOT_FOLDER_NAME,
                    "mimeType": FOLDER_MIME_TYPE,
                    "parents": ["root"],
                });
                let response = self
                    .authed_request(reqwest::Method::POST, &format!("{base}/files"))
                    .await
                    .json(&metadata)
                    .send()
                    .await?;
                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(Self::classify_status(status, &body).into());
                }
                let created: DriveFile = response.json().await?;
                Ok(NativeId::new(created.id)?)
            }
            1 => {
                let file = &found.files[0];
                let at_root = file.parents.as_ref().is_some_and(|p| p.iter().any(|id| id == "root"));
                if !at_root {
                    let url = format!("{base}/files/{}?addParents=root", file.id);
                    let response = self.authed_request(reqwest::Method::PATCH, &url).await.send().await?;
                    if !response.status().is_success() {
                        let status = response.status();
                        let body = response.text().await.unwrap_or_default();
                        return Err(Self::classify_status(status, &body).into());
                    }
                }
                Ok(NativeId::new(file.id.clone())?)
            }
            n => Err(ProviderError::Ambiguity(format!(
                "found {n} folders named {SYNC_ROOT_FOLDER_NAME}, expected at most one"
            ))
            .into()),
        }
    }

    async fn export(&self, native_id: &NativeId, mime: &str) -> anyhow::Result<Box<dyn AsyncRead + Send + Unpin>> {
        self.export_stream(native_id, mime).await
    }

    async fn share_folder(&self, folder_id: &NativeId, account: &str) -> anyhow::Result<()> {
        if self.check_share(folder_id, account).await? {
            return Ok(());
        }
        let base = self.drive_base_url.as_str();
        let url = format!("{base}/files/{}/permissions", folder_id.as_str());
        let body = serde_json::json!({
            "role": "writer",
            "type": "user",
            "emailAddress": account,
        });
        let response = self.authed_request(reqwest::Method::POST, &url).await.json(&body).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &text).into());
        }
        Ok(())
    }

    async fn check_share(&self, folder_id: &NativeId, account: &str) -> anyhow::Result<bool> {
        #[derive(Deserialize)]
        struct Permissions {
            permissions: Vec<PermissionEmail>,
        }
        #[derive(Deserialize)]
        struct PermissionEmail {
            #[serde(rename = "emailAddress")]
            email_address: Option<String>,
        }

        let base = self.drive_base_url.as_str();
        let url = format!("{base}/files/{}/permissions?fields=permissions(emailAddress)", folder_id.as_str());
        let response = self.authed_request(reqwest::Method::GET, &url).await.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &body).into());
        }
        let permissions: Permissions = response.json().await?;
        Ok(permissions.permissions.iter().any(|p| p.email_address.as_deref() == Some(account)))
    }

    async fn list_changes(&self) -> anyhow::Result<Vec<RemoteEntry>> {
        let base = self.drive_base_url.as_str();
        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = format!(
                "{base}/files?fields=nextPageToken,files(id,name,mimeType,size,md5Checksum,modifiedTime,parents,trashed)&pageSize=1000"
            );
            if let Some(token) = &page_token {
                url.push_str(&format!("&pageToken={token}"));
            }

            let page: DriveFileList = with_retry(|| async {
                let response = self.authed_request(reqwest::Method::GET, &url).await.send().await
                    .map_err(|e| ProviderError::Transient(e.to_string()))?;
                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(Self::classify_status(status, &body));
                }
                response.json().await.map_err(|e| ProviderError::Other(e.into()))
            })
            .await?;

            for file in page.files {
                let (size, hash) = if is_proprietary_doc(&file.mime_type) {
                    let native_id = NativeId::new(file.id.clone())?;
                    let exported = self.export_bytes(&native_id, PROPRIETARY_EXPORT_MIME).await?;
                    (exported.len() as u64, Some(NativeHash::new(sha256_hex(&exported))))
                } else {
                    (file.size.and_then(|s| s.parse().ok()).unwrap_or(0), file.md5_checksum.map(NativeHash::new))
                };

                entries.push(RemoteEntry {
                    native_id: NativeId::new(file.id)?,
                    parent_native_id: file
                        .parents
                        .and_then(|p| p.into_iter().next())
                        .map(NativeId::new)
                        .transpose()?,
                    name: file.name.clone(),
                    path: SyncPath::new(file.name)?,
                    size,
                    hash,
                    modified: file.modified_time,
                    is_folder: file.mime_type == FOLDER_MIME_TYPE,
                    is_deleted: file.trashed.unwrap_or(false),
                });
            }

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        debug!(count = entries.len(), "google list_changes complete");
        Ok(entries)
    }

    async fn download(&self, native_id: &NativeId) -> anyhow::Result<Box<dyn AsyncRead + Send + Unpin>> {
        let base = self.drive_base_url.as_str();
        let url = format!("{base}/files/{}?alt=media", native_id.as_str());
        let response = self.authed_request(reqwest::Method::GET, &url).await.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &body).into());
        }
        let stream = response.bytes_stream();
        let reader = tokio_util::io::StreamReader::new(
            stream.map(|r| r.map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))),
        );
        Ok(Box::new(reader))
    }

    async fn upload(
        &self,
        parent: &SyncPath,
        name: &str,
        size: u64,
        mut data: Box<dyn AsyncRead + Send + Unpin>,
    ) -> anyhow::Result<RemoteEntry> {
        use tokio::io::AsyncReadExt;

        let upload_base = self.upload_base_url.as_str();
        let mut buf = Vec::with_capacity(size as usize);
        data.read_to_end(&mut buf).await?;

        let metadata = serde_json::json!({
            "name": name,
            "parents": [self.root_folder_id.as_str()],
        });

        let boundary = "cloudweave-upload-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n").as_bytes());
        body.extend_from_slice(metadata.to_string().as_bytes());
        body.extend_from_slice(format!("\r\n--{boundary}\r\nContent-Type: application/octet-stream\r\n\r\n").as_bytes());
        body.extend_from_slice(&buf);
        body.extend_from_slice(format!("\r\n--{boundary}--").as_bytes());

        let url = format!("{upload_base}/files?uploadType=multipart&fields=id,name,mimeType,size,md5Checksum,modifiedTime,parents");
        let access_token = self.token.access_token().await;
        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .header("Content-Type", format!("multipart/related; boundary={boundary}"))
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &text).into());
        }

        let file: DriveFile = response.json().await?;
        Ok(RemoteEntry {
            native_id: NativeId::new(file.id)?,
            parent_native_id: Some(self.root_folder_id.clone()),
            name: file.name.clone(),
            path: parent.join(&file.name).unwrap_or_else(|_| SyncPath::new(file.name).unwrap()),
            size,
            hash: file.md5_checksum.map(NativeHash::new),
            modified: file.modified_time,
            is_folder: false,
            is_deleted: false,
        })
    }

    async fn create_folder(&self, path: &SyncPath) -> anyhow::Result<()> {
        let base = self.drive_base_url.as_str();
        let metadata = serde_json::json!({
            "name": path.file_name(),
            "mimeType": FOLDER_MIME_TYPE,
            "parents": [self.root_folder_id.as_str()],
        });
        let response = self
            .authed_request(reqwest::Method::POST, &format!("{base}/files"))
            .await
            .json(&metadata)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &body).into());
        }
        Ok(())
    }

    async fn move_item(&self, native_id: &NativeId, destination: &SyncPath) -> anyhow::Result<()> {
        let base = self.drive_base_url.as_str();
        let url = format!(
            "{base}/files/{}?addParents={}",
            native_id.as_str(),
            self.root_folder_id.as_str()
        );
        let body = serde_json::json!({ "name": destination.file_name() });
        let response = self.authed_request(reqwest::Method::PATCH, &url).await.json(&body).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &text).into());
        }
        Ok(())
    }

    async fn delete(&self, native_id: &NativeId) -> anyhow::Result<()> {
        let base = self.drive_base_url.as_str();
        let url = format!("{base}/files/{}", native_id.as_str());
        let response = self.authed_request(reqwest::Method::DELETE, &url).await.send().await?;
        if !response.status().is_success() && response.status().as_u16() != 404 {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &body).into());
        }
        Ok(())
    }

    async fn quota(&self) -> anyhow::Result<QuotaInfo> {
        let base = self.drive_base_url.as_str();
        let url = format!("{base}/about?fields=storageQuota");
        let response = self.authed_request(reqwest::Method::GET, &url).await.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &body).into());
        }
        let about: AboutResponse = response.json().await?;
        Ok(QuotaInfo {
            used_bytes: about.storage_quota.usage.and_then(|s| s.parse().ok()).unwrap_or(0),
            total_bytes: about.storage_quota.limit.and_then(|s| s.parse().ok()).unwrap_or(0),
        })
    }

    async fn transfer_ownership(
        &self,
        native_id: &NativeId,
        recipient_account_id: &str,
    ) -> anyhow::Result<TransferOutcome> {
        let base = self.drive_base_url.as_str();
        let url = format!(
            "{base}/files/{}/permissions?transferOwnership=true&sendNotificationEmail=true",
            native_id.as_str()
        );
        let body = serde_json::json!({
            "role": "owner",
            "type": "user",
            "emailAddress": recipient_account_id,
        });
        let response = self.authed_request(reqwest::Method::POST, &url).await.json(&body).send().await?;
        let status = response.status();

        if status.as_u16() == 403 {
            let body = response.text().await.unwrap_or_default();
            if body.contains("consent") || body.contains("cannotTransferOwnershipToJustAny") {
                return Ok(TransferOutcome::ConsentRequired);
            }
            return Ok(TransferOutcome::Error(body));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Ok(TransferOutcome::Error(body));
        }

        let permission: PermissionResponse = response.json().await?;
        if permission.pending_owner.unwrap_or(true) {
            Ok(TransferOutcome::Pending)
        } else {
            Ok(TransferOutcome::Transferred)
        }
    }

    async fn accept_pending_ownership(&self, native_id: &NativeId) -> anyhow::Result<()> {
        // Recipient-side confirmation: list permissions for the file under
        // the recipient's own credentials and update the pending one to
        // role=owner, transferOwnership=true.
        let base = self.drive_base_url.as_str();
        let list_url = format!("{base}/files/{}/permissions?fields=permissions(id,role)", native_id.as_str());
        let response = self.authed_request(reqwest::Method::GET, &list_url).await.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &body).into());
        }

        #[derive(Deserialize)]
        struct Permissions {
            permissions: Vec<PermissionEntry>,
        }
        #[derive(Deserialize)]
        struct PermissionEntry {
            id: String,
            role: String,
        }

        let permissions: Permissions = response.json().await?;
        let Some(pending) = permissions.permissions.iter().find(|p| p.role == "owner") else {
            anyhow::bail!("no pending owner permission found for {}", native_id.as_str());
        };

        let update_url = format!(
            "{base}/files/{}/permissions/{}?transferOwnership=true",
            native_id.as_str(),
            pending.id
        );
        let body = serde_json::json!({ "role": "owner" });
        let response = self.authed_request(reqwest::Method::PATCH, &update_url).await.json(&body).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &text).into());
        }
        Ok(())
    }
}
