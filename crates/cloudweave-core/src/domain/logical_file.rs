//! The Logical File entity — the provider-independent notion of a file
//!
//! A Logical File mirrors the name/size/mod-time of its most recently
//! modified active Replica; see [`crate::domain::Replica`] for the physical
//! copies it owns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::DomainError;
use super::newtypes::{CalculatedId, LogicalFileId, SyncPath};

/// Lifecycle state of a [`LogicalFile`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Has at least one active replica somewhere and is not soft-deleted.
    #[default]
    Active,
    /// Moved under `sync-cloud-drives-aux/soft-deleted/` on at least one
    /// provider; still present everywhere, just relocated.
    SoftDeleted,
    /// Google-side replica confirmed gone while soft-deleted: the file is
    /// considered hard-deleted everywhere (§4.4 I4).
    Deleted,
}

impl FileStatus {
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, FileStatus::Active)
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            FileStatus::Active => "active",
            FileStatus::SoftDeleted => "softdeleted",
            FileStatus::Deleted => "deleted",
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for FileStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(FileStatus::Active),
            "softdeleted" => Ok(FileStatus::SoftDeleted),
            "deleted" => Ok(FileStatus::Deleted),
            other => Err(DomainError::ValidationFailed(format!(
                "unknown file status: {other}"
            ))),
        }
    }
}

/// The provider-independent identity of a file synchronized across accounts
///
/// Invariant: every active [`crate::domain::Replica`] of this file shares
/// `calculated_id`; `name`/`size`/`mod_time` mirror the most recently
/// modified active replica (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalFile {
    id: LogicalFileId,
    path: SyncPath,
    name: String,
    size: u64,
    calculated_id: CalculatedId,
    mod_time: DateTime<Utc>,
    status: FileStatus,
}

impl LogicalFile {
    /// Creates a brand-new logical file, deriving `calculated_id` from
    /// `name`/`size`.
    #[must_use]
    pub fn new(path: SyncPath, size: u64, mod_time: DateTime<Utc>) -> Self {
        let name = path.file_name().to_string();
        let calculated_id = CalculatedId::compute(&name, size);
        Self {
            id: LogicalFileId::new(),
            path,
            name,
            size,
            calculated_id,
            mod_time,
            status: FileStatus::Active,
        }
    }

    /// Reconstructs a logical file from stored fields (used by the store
    /// when loading rows).
    #[must_use]
    pub fn from_parts(
        id: LogicalFileId,
        path: SyncPath,
        name: String,
        size: u64,
        calculated_id: CalculatedId,
        mod_time: DateTime<Utc>,
        status: FileStatus,
    ) -> Self {
        Self {
            id,
            path,
            name,
            size,
            calculated_id,
            mod_time,
            status,
        }
    }

    #[must_use]
    pub fn id(&self) -> LogicalFileId {
        self.id
    }

    #[must_use]
    pub fn path(&self) -> &SyncPath {
        &self.path
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[must_use]
    pub fn calculated_id(&self) -> &CalculatedId {
        &self.calculated_id
    }

    #[must_use]
    pub fn mod_time(&self) -> DateTime<Utc> {
        self.mod_time
    }

    #[must_use]
    pub fn status(&self) -> FileStatus {
        self.status
    }

    pub fn set_status(&mut self, status: FileStatus) {
        self.status = status;
    }

    /// Mirrors the latest active replica's metadata onto this file, per
    /// `update_logical_from_latest_replica` (spec §4.2). `mod_time` only
    /// ever advances, never regresses.
    pub fn mirror_from_replica(
        &mut self,
        path: SyncPath,
        name: String,
        size: u64,
        calculated_id: CalculatedId,
        mod_time: DateTime<Utc>,
    ) {
        if mod_time < self.mod_time {
            return;
        }
        self.path = path;
        self.name = name;
        self.size = size;
        self.calculated_id = calculated_id;
        self.mod_time = mod_time;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> SyncPath {
        SyncPath::new(s).unwrap()
    }

    #[test]
    fn new_derives_calculated_id_from_path_and_size() {
        let file = LogicalFile::new(path("a/b/note.txt"), 100, Utc::now());
        assert_eq!(file.calculated_id().as_str(), "note.txt-100");
        assert_eq!(file.name(), "note.txt");
        assert_eq!(file.status(), FileStatus::Active);
    }

    #[test]
    fn mirror_from_replica_does_not_regress_mod_time() {
        let earlier = Utc::now() - chrono::Duration::hours(1);
        let mut file = LogicalFile::new(path("a.txt"), 10, Utc::now());
        let original_mod_time = file.mod_time();

        file.mirror_from_replica(
            path("a.txt"),
            "a.txt".to_string(),
            20,
            CalculatedId::compute("a.txt", 20),
            earlier,
        );

        assert_eq!(file.mod_time(), original_mod_time);
        assert_eq!(file.size(), 10, "stale update must be ignored");
    }

    #[test]
    fn mirror_from_replica_advances_on_newer_mod_time() {
        let later = Utc::now() + chrono::Duration::hours(1);
        let mut file = LogicalFile::new(path("a.txt"), 10, Utc::now());

        file.mirror_from_replica(
            path("a.txt"),
            "a.txt".to_string(),
            20,
            CalculatedId::compute("a.txt", 20),
            later,
        );

        assert_eq!(file.size(), 20);
        assert_eq!(file.mod_time(), later);
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [FileStatus::Active, FileStatus::SoftDeleted, FileStatus::Deleted] {
            let parsed: FileStatus = status.name().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }
}
