//! Telegram-channel-as-blob-store adapter
//!
//! There is no real filesystem here: a single channel (`sync-cloud-drives`)
//! is the entire store. Every uploaded file becomes one or more documents;
//! each document's caption carries the file's full replica metadata as
//! JSON, and folders are synthesized purely from the path strings those
//! captions carry (§4.1). This file is grounded on `grammers-client`'s
//! message/media API the way `tgcryptfs` drives it, generalized from a
//! full filesystem backend down to the much narrower `CloudProvider` port.
//!
//! A file whose size exceeds [`FRAGMENT_THRESHOLD`] is split into N
//! fragments, each sent as its own message; once every fragment has been
//! sent and Telegram has assigned it a message id, every fragment's caption
//! is edited in place to list the full set of sibling message ids so a
//! later `list_changes` pass can group and reorder them.
//!
//! This provider has no soft-delete intermediate: both I3 (soft-delete
//! propagation) and I4 (hard-delete propagation) converge a Telegram
//! replica straight to caption `status: "deleted"` via [`mark_deleted`],
//! never to a physical message delete — that keeps the replica visible in
//! channel history for audit while every other provider observes the
//! ordinary absence/tombstone path.
//!
//! [`mark_deleted`]: cloudweave_core::ports::CloudProvider::mark_deleted

use std::sync::Arc;

use chrono::{DateTime, Utc};
use grammers_client::types::Chat;
use grammers_client::{Client, InputMessage};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use cloudweave_core::domain::{NativeId, Provider, SyncPath, TransferOutcome};
use cloudweave_core::ports::{QuotaInfo, RemoteEntry};

use crate::error::ProviderError;

/// Telegram's per-message upload ceiling, minus a safety margin (§4.1).
pub const FRAGMENT_THRESHOLD: u64 = 2 * 1024 * 1024 * 1024 - 8 * 1024 * 1024;

const NATIVE_ID_SEPARATOR: char = ',';

/// The `replica` object inside every caption this adapter writes (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ReplicaCaption {
    path: String,
    name: String,
    size: u64,
    calculated_id: String,
    mod_time: DateTime<Utc>,
    status: CaptionStatus,
}

/// Mirrors [`cloudweave_core::domain::FileStatus`] but Telegram only ever
/// writes the two endpoints of that state machine: a replica is either
/// live or it has converged straight to `deleted` (no intermediate
/// soft-deleted caption state).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum CaptionStatus {
    Active,
    Deleted,
}

/// Caption JSON embedded in every message this adapter sends:
/// `{"replica": {...}, "replica_fragment": {...}?}` (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MessageCaption {
    replica: ReplicaCaption,
    #[serde(skip_serializing_if = "Option::is_none")]
    replica_fragment: Option<FragmentCaption>,
    /// Present once every fragment of a multi-part upload has a message id.
    #[serde(default)]
    sibling_message_ids: Vec<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FragmentCaption {
    number: u32,
    total: u32,
    size: u64,
}

pub struct TelegramProvider {
    client: Client,
    channel: Chat,
}

impl TelegramProvider {
    /// `channel_username` is the public or private username of the
    /// dedicated store channel (`sync-cloud-drives`); must already exist
    /// and have this account as a member with post rights.
    pub async fn new(client: Client, channel_username: &str) -> anyhow::Result<Self> {
        let channel = client
            .resolve_username(channel_username)
            .await?
            .ok_or_else(|| anyhow::anyhow!("channel {channel_username} not found"))?;
        Ok(Self { client, channel })
    }

    fn join_ids(ids: &[i32]) -> String {
        ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(&NATIVE_ID_SEPARATOR.to_string())
    }

    fn split_ids(native_id: &NativeId) -> anyhow::Result<Vec<i32>> {
        native_id
            .as_str()
            .split(NATIVE_ID_SEPARATOR)
            .map(|s| s.parse::<i32>().map_err(|e| anyhow::anyhow!("bad telegram message id {s}: {e}")))
            .collect()
    }

    /// Fetches every message that makes up one replica's native id.
    async fn fetch_messages(
        &self,
        message_ids: &[i32],
    ) -> anyhow::Result<Vec<grammers_client::types::Message>> {
        self.client
            .get_messages_by_id(&self.channel, message_ids)
            .await?
            .into_iter()
            .map(|m| m.ok_or_else(|| ProviderError::NotFound("telegram message gone".into()).into()))
            .collect()
    }

    async fn upload_whole(
        &self,
        bytes: Vec<u8>,
        path: &SyncPath,
        name: &str,
        calculated_id: &str,
    ) -> anyhow::Result<RemoteEntry> {
        let replica = ReplicaCaption {
            path: path.as_str().to_string(),
            name: name.to_string(),
            size: bytes.len() as u64,
            calculated_id: calculated_id.to_string(),
            mod_time: Utc::now(),
            status: CaptionStatus::Active,
        };
        let caption = MessageCaption { replica: replica.clone(), replica_fragment: None, sibling_message_ids: Vec::new() };
        let mut stream = std::io::Cursor::new(bytes.clone());
        let input_file = self.client.upload_stream(&mut stream, bytes.len(), name.to_string()).await?;
        let message = self
            .client
            .send_message(
                &self.channel,
                InputMessage::text(serde_json::to_string(&caption)?).document(input_file),
            )
            .await?;

        let ids = vec![message.id()];
        let final_caption = MessageCaption { sibling_message_ids: ids.clone(), ..caption };
        self.client
            .edit_message(&self.channel, message.id(), InputMessage::text(serde_json::to_string(&final_caption)?))
            .await?;

        Ok(RemoteEntry {
            native_id: NativeId::new(Self::join_ids(&ids))?,
            parent_native_id: None,
            name: name.to_string(),
            path: path.clone(),
            size: replica.size,
            hash: None,
            modified: replica.mod_time,
            is_folder: false,
            is_deleted: false,
        })
    }

    async fn upload_fragmented(
        &self,
        bytes: Vec<u8>,
        path: &SyncPath,
        name: &str,
        calculated_id: &str,
    ) -> anyhow::Result<RemoteEntry> {
        let total_size = bytes.len() as u64;
        let chunks: Vec<&[u8]> = bytes.chunks(FRAGMENT_THRESHOLD as usize).collect();
        let total = chunks.len() as u32;
        let mod_time = Utc::now();

        let mut message_ids = Vec::with_capacity(chunks.len());
        for (index, chunk) in chunks.iter().enumerate() {
            let replica = ReplicaCaption {
                path: path.as_str().to_string(),
                name: name.to_string(),
                size: total_size,
                calculated_id: calculated_id.to_string(),
                mod_time,
                status: CaptionStatus::Active,
            };
            let caption = MessageCaption {
                replica,
                replica_fragment: Some(FragmentCaption { number: index as u32, total, size: chunk.len() as u64 }),
                sibling_message_ids: Vec::new(),
            };
            let mut stream = std::io::Cursor::new(chunk.to_vec());
            let input_file = self
                .client
                .upload_stream(&mut stream, chunk.len(), format!("{name}.part{index}"))
                .await?;
            let message = self
                .client
                .send_message(
                    &self.channel,
                    InputMessage::text(serde_json::to_string(&caption)?).document(input_file),
                )
                .await?;
            message_ids.push(message.id());
        }

        for (index, &message_id) in message_ids.iter().enumerate() {
            let replica = ReplicaCaption {
                path: path.as_str().to_string(),
                name: name.to_string(),
                size: total_size,
                calculated_id: calculated_id.to_string(),
                mod_time,
                status: CaptionStatus::Active,
            };
            let caption = MessageCaption {
                replica,
                replica_fragment: Some(FragmentCaption { number: index as u32, total, size: chunks[index].len() as u64 }),
                sibling_message_ids: message_ids.clone(),
            };
            self.client
                .edit_message(&self.channel, message_id, InputMessage::text(serde_json::to_string(&caption)?))
                .await?;
        }

        Ok(RemoteEntry {
            native_id: NativeId::new(Self::join_ids(&message_ids))?,
            parent_native_id: None,
            name: name.to_string(),
            path: path.clone(),
            size: total_size,
            hash: None,
            modified: mod_time,
            is_folder: false,
            is_deleted: false,
        })
    }

    /// Reads every message that forms `native_id` and edits each one's
    /// caption's `replica.status` field to `deleted` in place, leaving the
    /// messages themselves (and their media) untouched.
    async fn edit_caption_status_deleted(&self, native_id: &NativeId) -> anyhow::Result<()> {
        let message_ids = Self::split_ids(native_id)?;
        let messages = self.fetch_messages(&message_ids).await?;
        for message in messages {
            let Some(text) = message.text().lines().next() else { continue };
            let Ok(mut caption) = serde_json::from_str::<MessageCaption>(text) else { continue };
            caption.replica.status = CaptionStatus::Deleted;
            self.client
                .edit_message(&self.channel, message.id(), InputMessage::text(serde_json::to_string(&caption)?))
                .await?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl cloudweave_core::ports::CloudProvider for TelegramProvider {
    fn provider(&self) -> Provider {
        Provider::Telegram
    }

    /// The store channel itself is this provider's only possible sync root;
    /// there is no ambiguity to detect and nothing to relocate, so this
    /// just confirms the channel is reachable and reports its id.
    async fn preflight(&self) -> anyhow::Result<NativeId> {
        NativeId::new(self.channel.id().to_string())
    }

    async fn share_folder(&self, _folder_id: &NativeId, _account: &str) -> anyhow::Result<()> {
        anyhow::bail!("telegram has a single channel account; cross-account sharing does not apply")
    }

    async fn check_share(&self, _folder_id: &NativeId, _account: &str) -> anyhow::Result<bool> {
        anyhow::bail!("telegram has a single channel account; cross-account sharing does not apply")
    }

    async fn list_changes(&self) -> anyhow::Result<Vec<RemoteEntry>> {
        use std::collections::HashMap;

        let mut by_calculated_id: HashMap<String, Vec<(i32, MessageCaption)>> = HashMap::new();
        let mut whole_files = Vec::new();

        let mut iter = self.client.iter_messages(&self.channel);
        while let Some(message) = iter.next().await? {
            let Some(text) = message.text().lines().next() else { continue };
            let Ok(caption) = serde_json::from_str::<MessageCaption>(text) else { continue };
            if caption.replica.status == CaptionStatus::Deleted {
                continue;
            }

            match &caption.replica_fragment {
                None => whole_files.push((message.id(), caption)),
                Some(_) => {
                    by_calculated_id.entry(caption.replica.calculated_id.clone()).or_default().push((message.id(), caption))
                }
            }
        }

        let mut entries = Vec::with_capacity(whole_files.len() + by_calculated_id.len());

        for (message_id, caption) in whole_files {
            entries.push(RemoteEntry {
                native_id: NativeId::new(message_id.to_string())?,
                parent_native_id: None,
                name: caption.replica.name,
                path: SyncPath::new(caption.replica.path)?,
                size: caption.replica.size,
                hash: None,
                modified: caption.replica.mod_time,
                is_folder: false,
                is_deleted: false,
            });
        }

        for (calculated_id, mut parts) in by_calculated_id {
            parts.sort_by_key(|(_, caption)| caption.replica_fragment.as_ref().map_or(0, |f| f.number));
            let Some((_, representative)) = parts.first().cloned() else { continue };
            let ids: Vec<i32> = parts.iter().map(|(id, _)| *id).collect();
            debug!(calculated_id, fragments = ids.len(), "reassembled telegram fragment group");
            entries.push(RemoteEntry {
                native_id: NativeId::new(Self::join_ids(&ids))?,
                parent_native_id: None,
                name: representative.replica.name,
                path: SyncPath::new(representative.replica.path)?,
                size: representative.replica.size,
                hash: None,
                modified: representative.replica.mod_time,
                is_folder: false,
                is_deleted: false,
            });
        }

        Ok(entries)
    }

    async fn download(&self, native_id: &NativeId) -> anyhow::Result<Box<dyn AsyncRead + Send + Unpin>> {
        let message_ids = Self::split_ids(native_id)?;
        let mut buf = Vec::new();
        for message_id in message_ids {
            let message = self
                .client
                .get_messages_by_id(&self.channel, &[message_id])
                .await?
                .into_iter()
                .next()
                .flatten()
                .ok_or_else(|| ProviderError::NotFound(format!("telegram message {message_id} gone")))?;
            let media = message.media().ok_or_else(|| ProviderError::NotFound("message carries no media".into()))?;
            let mut download = self.client.iter_download(&media);
            while let Some(chunk) = download.next().await? {
                buf.extend_from_slice(&chunk);
            }
        }
        Ok(Box::new(std::io::Cursor::new(buf)))
    }

    async fn upload(
        &self,
        parent: &SyncPath,
        name: &str,
        size: u64,
        mut data: Box<dyn AsyncRead + Send + Unpin>,
    ) -> anyhow::Result<RemoteEntry> {
        let mut bytes = Vec::with_capacity(size as usize);
        data.read_to_end(&mut bytes).await?;

        let path = parent.join(name).unwrap_or_else(|_| SyncPath::new(name).unwrap());
        let calculated_id = format!("{name}-{}", bytes.len());

        if bytes.len() as u64 > FRAGMENT_THRESHOLD {
            self.upload_fragmented(bytes, &path, name, &calculated_id).await
        } else {
            self.upload_whole(bytes, &path, name, &calculated_id).await
        }
    }

    /// Telegram has no native folders; the path is carried entirely in
    /// caption metadata, so there is nothing to create here.
    async fn create_folder(&self, _path: &SyncPath) -> anyhow::Result<()> {
        Ok(())
    }

    async fn move_item(&self, native_id: &NativeId, destination: &SyncPath) -> anyhow::Result<()> {
        let message_ids = Self::split_ids(native_id)?;
        for message_id in message_ids {
            let message = self
                .client
                .get_messages_by_id(&self.channel, &[message_id])
                .await?
                .into_iter()
                .next()
                .flatten()
                .ok_or_else(|| ProviderError::NotFound(format!("telegram message {message_id} gone")))?;
            let Some(text) = message.text().lines().next() else { continue };
            let Ok(mut caption) = serde_json::from_str::<MessageCaption>(text) else { continue };
            caption.replica.path = destination.as_str().to_string();
            caption.replica.name = destination.file_name().to_string();
            self.client
                .edit_message(&self.channel, message_id, InputMessage::text(serde_json::to_string(&caption)?))
                .await?;
        }
        Ok(())
    }

    /// Physically removes the messages. Only ever invoked for an actual
    /// user-requested purge; the reconciler's routine soft/hard-delete
    /// propagation goes through [`mark_deleted`] instead.
    ///
    /// [`mark_deleted`]: cloudweave_core::ports::CloudProvider::mark_deleted
    async fn delete(&self, native_id: &NativeId) -> anyhow::Result<()> {
        let message_ids = Self::split_ids(native_id)?;
        self.client.delete_messages(&self.channel, &message_ids).await?;
        Ok(())
    }

    /// Converges straight to caption `status: "deleted"` rather than
    /// physically deleting the messages (I3/I4).
    async fn mark_deleted(&self, native_id: &NativeId) -> anyhow::Result<()> {
        self.edit_caption_status_deleted(native_id).await
    }

    /// A Telegram channel has no storage ceiling in the sense the other
    /// two providers do (§4.1: "quota returns unlimited").
    async fn quota(&self) -> anyhow::Result<QuotaInfo> {
        Ok(QuotaInfo { used_bytes: 0, total_bytes: u64::MAX })
    }

    /// There is exactly one Telegram account in this design (T is always
    /// the single channel account, §4.5); ownership transfer between
    /// Telegram accounts is not a scenario this adapter needs to support.
    async fn transfer_ownership(
        &self,
        _native_id: &NativeId,
        _recipient_account_id: &str,
    ) -> anyhow::Result<TransferOutcome> {
        Ok(TransferOutcome::Unsupported)
    }

    async fn accept_pending_ownership(&self, _native_id: &NativeId) -> anyhow::Result<()> {
        anyhow::bail!("telegram never reports a Pending ownership transfer")
    }
}
