//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for the identifiers and fingerprints that flow
//! between providers, the metadata store, and the engines. Each newtype
//! enforces its invariant at construction time so downstream code never has
//! to re-validate a bare `String`.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

// ============================================================================
// Logical file identity
// ============================================================================

/// Process-generated identity of a [`crate::domain::LogicalFile`]
///
/// Stable for the lifetime of the file across every provider it is
/// replicated to; never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalFileId(Uuid);

impl LogicalFileId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for LogicalFileId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for LogicalFileId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LogicalFileId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| DomainError::InvalidId(format!("invalid logical file id: {e}")))
    }
}

/// Store-local autoincrement id of a [`crate::domain::Replica`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplicaId(i64);

impl ReplicaId {
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for ReplicaId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Store-local autoincrement id of a [`crate::domain::ReplicaFragment`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FragmentId(i64);

impl FragmentId {
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for FragmentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a [`crate::domain::Folder`] row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderId(i64);

impl FolderId {
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for FolderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Account identity
// ============================================================================

/// An account identifier: the provider's login (email for G/M, phone for T)
///
/// Deliberately a validated newtype rather than a bare `String` so that a
/// typo can't silently create a second account record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// # Errors
    /// Returns [`DomainError::ValidationFailed`] if `raw` is empty or all whitespace.
    pub fn new(raw: impl Into<String>) -> Result<Self, DomainError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(DomainError::ValidationFailed(
                "account id must not be empty".to_string(),
            ));
        }
        Ok(Self(raw))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for AccountId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Fingerprints and provider-native references
// ============================================================================

/// The cross-provider fingerprint `<name>-<size>` used to group replicas of
/// the same logical file.
///
/// Not a content hash; see spec Open Question on duplicate-detection
/// granularity (resolved in DESIGN.md).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalculatedId(String);

impl CalculatedId {
    #[must_use]
    pub fn compute(name: &str, size: u64) -> Self {
        Self(format!("{name}-{size}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CalculatedId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CalculatedId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The id a provider assigns to a file, folder, or (for Telegram) message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NativeId(String);

impl NativeId {
    /// # Errors
    /// Returns [`DomainError::ValidationFailed`] if `raw` is empty.
    pub fn new(raw: impl Into<String>) -> Result<Self, DomainError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(DomainError::ValidationFailed(
                "native id must not be empty".to_string(),
            ));
        }
        Ok(Self(raw))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for NativeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A provider-native content hash (MD5 for Google, quickXor/SHA-1 for
/// Microsoft, absent for Telegram and for Google's proprietary document
/// types).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NativeHash(String);

impl NativeHash {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for NativeHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Paths
// ============================================================================

/// A forward-slash normalized path relative to the sync root
///
/// Used for both the Logical File's `path` and Replica/Folder native paths;
/// providers that use backslashes or drive letters are not in scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncPath(String);

impl SyncPath {
    /// # Errors
    /// Returns [`DomainError::InvalidPath`] for absolute paths, `..`
    /// components, or a trailing slash (which would make a file look like a
    /// directory).
    pub fn new(raw: impl Into<String>) -> Result<Self, DomainError> {
        let raw = raw.into().replace('\\', "/");
        let normalized = Self::normalize(&raw)?;
        Ok(Self(normalized))
    }

    fn normalize(raw: &str) -> Result<String, DomainError> {
        let mut parts: Vec<&str> = Vec::new();
        for segment in raw.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    return Err(DomainError::InvalidPath(format!(
                        "path escapes sync root via '..': {raw}"
                    )));
                }
                other => parts.push(other),
            }
        }
        if parts.is_empty() {
            return Err(DomainError::InvalidPath("path must not be empty".into()));
        }
        Ok(parts.join("/"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File or folder name: the final path component.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Parent path, or `None` at the sync root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.0
            .rsplit_once('/')
            .map(|(parent, _)| Self(parent.to_string()))
    }

    /// Joins a child segment onto this path.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidPath`] if `child` contains a path
    /// separator or parent-dir marker.
    pub fn join(&self, child: &str) -> Result<Self, DomainError> {
        if child.contains('/') || child.contains("..") {
            return Err(DomainError::InvalidPath(format!(
                "invalid path segment: {child}"
            )));
        }
        Self::new(format!("{}/{}", self.0, child))
    }

    /// True if `self` is `other` or a descendant of `other`.
    #[must_use]
    pub fn starts_with(&self, other: &Self) -> bool {
        self.0 == other.0 || self.0.starts_with(&format!("{}/", other.0))
    }

    /// Rewrites the `old_prefix` component of this path to `new_prefix`.
    ///
    /// Used by soft-delete propagation to move a path under
    /// `sync-cloud-drives-aux/soft-deleted/`.
    ///
    /// # Errors
    /// Returns [`DomainError::PathNotInSyncRoot`] if this path is not under
    /// `old_prefix`.
    pub fn rebase(&self, old_prefix: &Self, new_prefix: &Self) -> Result<Self, DomainError> {
        if self.0 == old_prefix.0 {
            return Ok(new_prefix.clone());
        }
        let suffix = self.0.strip_prefix(&format!("{}/", old_prefix.0)).ok_or_else(|| {
            DomainError::PathNotInSyncRoot(format!("{} is not under {}", self.0, old_prefix.0))
        })?;
        Self::new(format!("{}/{}", new_prefix.0, suffix))
    }
}

impl Display for SyncPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SyncPath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calculated_id_format() {
        let id = CalculatedId::compute("note.txt", 100);
        assert_eq!(id.as_str(), "note.txt-100");
    }

    #[test]
    fn sync_path_normalizes_dots_and_slashes() {
        let path = SyncPath::new("./a//b/./c/").unwrap();
        assert_eq!(path.as_str(), "a/b/c");
    }

    #[test]
    fn sync_path_rejects_parent_dir() {
        assert!(SyncPath::new("a/../b").is_err());
    }

    #[test]
    fn sync_path_file_name_and_parent() {
        let path = SyncPath::new("a/b/note.txt").unwrap();
        assert_eq!(path.file_name(), "note.txt");
        assert_eq!(path.parent().unwrap().as_str(), "a/b");
        assert!(SyncPath::new("note.txt").unwrap().parent().is_none());
    }

    #[test]
    fn sync_path_starts_with() {
        let root = SyncPath::new("sync-cloud-drives-aux/soft-deleted").unwrap();
        let nested = SyncPath::new("sync-cloud-drives-aux/soft-deleted/a/b.txt").unwrap();
        assert!(nested.starts_with(&root));
        assert!(!root.starts_with(&nested));
    }

    #[test]
    fn sync_path_rebase() {
        let old = SyncPath::new("r").unwrap();
        let new = SyncPath::new("sync-cloud-drives-aux/soft-deleted/r").unwrap();
        let path = SyncPath::new("r/y.bin").unwrap();
        let rebased = path.rebase(&old, &new).unwrap();
        assert_eq!(rebased.as_str(), "sync-cloud-drives-aux/soft-deleted/r/y.bin");
    }

    #[test]
    fn account_id_rejects_blank() {
        assert!(AccountId::new("   ").is_err());
        assert!(AccountId::new("user@example.com").is_ok());
    }
}
