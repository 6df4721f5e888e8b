//! The folder skeleton mirrored across native-folder providers

use serde::{Deserialize, Serialize};

use super::newtypes::{AccountId, FolderId, NativeId, SyncPath};
use super::provider::Provider;

/// A directory node mirrored across Google/Microsoft accounts (§4.4, I5)
///
/// Telegram has no native folder hierarchy ([`Provider::has_native_folders`]
/// is `false` for it) so folders are never created there; its virtual
/// directory structure is derived from caption metadata instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    id: FolderId,
    account_id: AccountId,
    provider: Provider,
    native_id: NativeId,
    path: SyncPath,
}

impl Folder {
    #[must_use]
    pub fn new(account_id: AccountId, provider: Provider, native_id: NativeId, path: SyncPath) -> Self {
        Self {
            id: FolderId::new(0),
            account_id,
            provider,
            native_id,
            path,
        }
    }

    #[must_use]
    pub fn from_parts(
        id: FolderId,
        account_id: AccountId,
        provider: Provider,
        native_id: NativeId,
        path: SyncPath,
    ) -> Self {
        Self {
            id,
            account_id,
            provider,
            native_id,
            path,
        }
    }

    pub fn assign_id(&mut self, id: FolderId) {
        self.id = id;
    }

    #[must_use]
    pub fn id(&self) -> FolderId {
        self.id
    }

    #[must_use]
    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    #[must_use]
    pub fn provider(&self) -> Provider {
        self.provider
    }

    #[must_use]
    pub fn native_id(&self) -> &NativeId {
        &self.native_id
    }

    #[must_use]
    pub fn path(&self) -> &SyncPath {
        &self.path
    }

    /// True if `self` is the immediate parent directory of `child`.
    #[must_use]
    pub fn is_parent_of(&self, child: &SyncPath) -> bool {
        child.parent().as_ref() == Some(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_immediate_parent() {
        let folder = Folder::new(
            AccountId::new("acct").unwrap(),
            Provider::Google,
            NativeId::new("f1").unwrap(),
            SyncPath::new("docs/reports").unwrap(),
        );
        assert!(folder.is_parent_of(&SyncPath::new("docs/reports/q1.txt").unwrap()));
        assert!(!folder.is_parent_of(&SyncPath::new("docs/q1.txt").unwrap()));
    }
}
