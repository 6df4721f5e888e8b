//! Physical copies of a [`crate::domain::LogicalFile`] on a single account

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::logical_file::FileStatus;
use super::newtypes::{AccountId, CalculatedId, LogicalFileId, NativeHash, NativeId, ReplicaId, SyncPath};
use super::provider::Provider;

/// One provider-side copy of a logical file
///
/// Ties a [`crate::domain::LogicalFile`] to the native object that holds its
/// bytes on a specific [`AccountId`]. Telegram replicas additionally own one
/// or more [`crate::domain::ReplicaFragment`] rows when the file exceeds the
/// single-message size ceiling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Replica {
    id: ReplicaId,
    logical_file_id: LogicalFileId,
    account_id: AccountId,
    provider: Provider,
    native_id: NativeId,
    native_hash: Option<NativeHash>,
    path: SyncPath,
    name: String,
    size: u64,
    calculated_id: CalculatedId,
    mod_time: DateTime<Utc>,
    status: FileStatus,
}

impl Replica {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        logical_file_id: LogicalFileId,
        account_id: AccountId,
        provider: Provider,
        native_id: NativeId,
        native_hash: Option<NativeHash>,
        path: SyncPath,
        size: u64,
        mod_time: DateTime<Utc>,
    ) -> Self {
        let name = path.file_name().to_string();
        let calculated_id = CalculatedId::compute(&name, size);
        Self {
            id: ReplicaId::new(0),
            logical_file_id,
            account_id,
            provider,
            native_id,
            native_hash,
            path,
            name,
            size,
            calculated_id,
            mod_time,
            status: FileStatus::Active,
        }
    }

    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: ReplicaId,
        logical_file_id: LogicalFileId,
        account_id: AccountId,
        provider: Provider,
        native_id: NativeId,
        native_hash: Option<NativeHash>,
        path: SyncPath,
        name: String,
        size: u64,
        calculated_id: CalculatedId,
        mod_time: DateTime<Utc>,
        status: FileStatus,
    ) -> Self {
        Self {
            id,
            logical_file_id,
            account_id,
            provider,
            native_id,
            native_hash,
            path,
            name,
            size,
            calculated_id,
            mod_time,
            status,
        }
    }

    pub fn assign_id(&mut self, id: ReplicaId) {
        self.id = id;
    }

    #[must_use]
    pub fn id(&self) -> ReplicaId {
        self.id
    }

    #[must_use]
    pub fn logical_file_id(&self) -> LogicalFileId {
        self.logical_file_id
    }

    pub fn set_logical_file_id(&mut self, id: LogicalFileId) {
        self.logical_file_id = id;
    }

    #[must_use]
    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    /// Reassigns ownership after a capacity-engine transfer or copy (§4.5).
    pub fn set_account_id(&mut self, account_id: AccountId) {
        self.account_id = account_id;
    }

    #[must_use]
    pub fn provider(&self) -> Provider {
        self.provider
    }

    #[must_use]
    pub fn native_id(&self) -> &NativeId {
        &self.native_id
    }

    pub fn set_native_id(&mut self, native_id: NativeId) {
        self.native_id = native_id;
    }

    #[must_use]
    pub fn native_hash(&self) -> Option<&NativeHash> {
        self.native_hash.as_ref()
    }

    #[must_use]
    pub fn path(&self) -> &SyncPath {
        &self.path
    }

    pub fn set_path(&mut self, path: SyncPath) {
        self.name = path.file_name().to_string();
        self.path = path;
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

    /// True when `other` shares this replica's path but a different
    /// `calculated_id` — the cross-provider conflict trigger (I2).
    #[must_use]
    pub fn conflicts_with(&self, other: &Replica) -> bool {
        self.path == other.path && self.calculated_id != other.calculated_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::newtypes::AccountId as Acc;

    fn replica(path: &str, size: u64) -> Replica {
        Replica::new(
            LogicalFileId::new(),
            Acc::new("acct-1").unwrap(),
            Provider::Google,
            NativeId::new("native-1").unwrap(),
            None,
            SyncPath::new(path).unwrap(),
            size,
            Utc::now(),
        )
    }

    #[test]
    fn same_path_different_calculated_id_conflicts() {
        let a = replica("doc.txt", 10);
        let b = replica("doc.txt", 20);
        assert!(a.conflicts_with(&b));
    }

    #[test]
    fn same_path_same_calculated_id_does_not_conflict() {
        let a = replica("doc.txt", 10);
        let b = replica("doc.txt", 10);
        assert!(!a.conflicts_with(&b));
    }

    #[test]
    fn different_path_never_conflicts() {
        let a = replica("a.txt", 10);
        let b = replica("b.txt", 99);
        assert!(!a.conflicts_with(&b));
    }
}
