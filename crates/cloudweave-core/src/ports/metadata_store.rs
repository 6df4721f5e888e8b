//! Metadata store port (driven/secondary port)
//!
//! This module defines the interface for persisting and querying the
//! normalized cross-provider metadata (logical files, replicas, fragments,
//! folders, accounts).
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific
//!   (SQLite, encryption, etc.) and don't need domain-level classification.
//! - `ReplicaFilter` is a composable query mechanism without exposing
//!   storage implementation details, mirroring the teacher's `ItemFilter`.
//! - The five reconcile operations (`update_logical_from_latest_replica`
//!   through `mark_stale_deleted`) are expected to run inside a single
//!   transaction per scan pass; implementations should document their own
//!   atomicity guarantees beyond that.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    AccountId, CalculatedId, Folder, FolderId, LogicalFile, LogicalFileId, Provider, Replica,
    ReplicaFragment, ReplicaId, SyncPath, UserAccount,
};

/// Filter criteria for querying replicas
///
/// All fields are optional; when `None`, no filtering is applied for that
/// field. Multiple filters are combined with AND logic.
#[derive(Debug, Clone, Default)]
pub struct ReplicaFilter {
    pub account_id: Option<AccountId>,
    pub provider: Option<Provider>,
    pub path_prefix: Option<SyncPath>,
    pub calculated_id: Option<CalculatedId>,
    pub modified_since: Option<DateTime<Utc>>,
}

impl ReplicaFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_account_id(mut self, account_id: AccountId) -> Self {
        self.account_id = Some(account_id);
        self
    }

    #[must_use]
    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn with_path_prefix(mut self, path_prefix: SyncPath) -> Self {
        self.path_prefix = Some(path_prefix);
        self
    }

    #[must_use]
    pub fn with_calculated_id(mut self, calculated_id: CalculatedId) -> Self {
        self.calculated_id = Some(calculated_id);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.account_id.is_none()
            && self.provider.is_none()
            && self.path_prefix.is_none()
            && self.calculated_id.is_none()
            && self.modified_since.is_none()
    }
}

/// Per-provider storage usage, as returned by `usage_by_provider`.
#[derive(Debug, Clone, Copy)]
pub struct ProviderUsage {
    pub account_id_count: usize,
    pub used_bytes: u64,
    pub total_bytes: u64,
}

/// Port trait for persistent metadata storage
///
/// This is the primary interface for all persistence operations over the
/// normalized logical-file / replica / fragment / folder / account model.
/// Implementations should ensure atomicity for individual operations and
/// may use an internal transaction for the batch reconcile operations.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    // --- Accounts ---

    async fn upsert_account(&self, account: &UserAccount) -> anyhow::Result<()>;
    async fn get_account(&self, id: &AccountId) -> anyhow::Result<Option<UserAccount>>;
    async fn list_accounts(&self) -> anyhow::Result<Vec<UserAccount>>;
    async fn list_accounts_by_provider(&self, provider: Provider) -> anyhow::Result<Vec<UserAccount>>;

    // --- Logical files ---

    async fn get_logical_file(&self, id: LogicalFileId) -> anyhow::Result<Option<LogicalFile>>;
    async fn find_logical_file_by_calculated_id(
        &self,
        calculated_id: &CalculatedId,
    ) -> anyhow::Result<Option<LogicalFile>>;
    async fn list_logical_files(&self) -> anyhow::Result<Vec<LogicalFile>>;
    async fn upsert_logical_file(&self, file: &LogicalFile) -> anyhow::Result<()>;

    // --- Replicas ---

    async fn list_replicas(&self, filter: &ReplicaFilter) -> anyhow::Result<Vec<Replica>>;
    async fn get_replicas_for_logical_file(&self, id: LogicalFileId) -> anyhow::Result<Vec<Replica>>;

    /// Inserts or updates many scanned replicas in one call, as emitted by
    /// the scanner's single-writer flush task. Each replica not yet carrying
    /// a `logical_file_id` is left orphaned for `link_orphaned_replicas`.
    async fn batch_upsert_replicas(&self, replicas: &[Replica]) -> anyhow::Result<()>;

    async fn delete_fragments_for_replica(&self, replica_id: ReplicaId) -> anyhow::Result<()>;
    async fn insert_fragments(&self, fragments: &[ReplicaFragment]) -> anyhow::Result<()>;
    async fn get_fragments_for_replica(&self, replica_id: ReplicaId) -> anyhow::Result<Vec<ReplicaFragment>>;

    // --- Reconcile pipeline (spec §4.2/§4.3, run as one transaction) ---

    /// Mirrors the most-recently-modified active replica's name/size/path
    /// onto its logical file.
    async fn update_logical_from_latest_replica(&self) -> anyhow::Result<u64>;

    /// Links replicas with no `logical_file_id` to an existing logical file
    /// sharing their `calculated_id`, creating the logical file row first if
    /// none exists yet.
    async fn link_orphaned_replicas(&self) -> anyhow::Result<u64>;

    /// Second pass for orphans still unlinked after `link_orphaned_replicas`
    /// (e.g. the first replica of a brand-new file): promotes each to its
    /// own new logical file.
    async fn promote_orphaned_replicas(&self) -> anyhow::Result<u64>;

    /// Marks every replica not seen since `scan_started` (its `last_seen_at`
    /// predates the scan) and not already [`crate::domain::FileStatus::Deleted`]
    /// as `Deleted` — this covers replicas the scanner never re-observed
    /// this run, whether they were active or already soft-deleted.
    async fn mark_stale_deleted(&self, scan_started: DateTime<Utc>) -> anyhow::Result<u64>;

    /// Removes one replica row outright, used when a capacity-engine move
    /// changes a replica's `(provider, account_id, native_id)` identity and
    /// the old row must be retired rather than left as a stale duplicate.
    async fn delete_replica(&self, id: ReplicaId) -> anyhow::Result<()>;

    // --- Folders ---

    async fn upsert_folder(&self, folder: &Folder) -> anyhow::Result<()>;
    async fn list_folders(&self, account_id: &AccountId) -> anyhow::Result<Vec<Folder>>;
    async fn get_folder(&self, id: FolderId) -> anyhow::Result<Option<Folder>>;

    // --- Reporting ---

    /// Aggregates quota usage per provider across all known accounts, used
    /// by the capacity engine's overloaded/target classification.
    async fn usage_by_provider(&self) -> anyhow::Result<Vec<(Provider, ProviderUsage)>>;

    /// Returns calculated ids shared by more than one *independent* logical
    /// file (distinct from the intended one-logical-file-per-calculated-id
    /// invariant; surfaced for the duplicate-detection refinement recorded
    /// in DESIGN.md).
    async fn duplicate_calculated_ids(&self) -> anyhow::Result<Vec<CalculatedId>>;
}
