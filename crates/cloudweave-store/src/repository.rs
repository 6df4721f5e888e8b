//! SQLite implementation of [`MetadataStore`]
//!
//! This module provides the concrete SQLite-based implementation of the
//! metadata store port defined in `cloudweave-core`. It handles all domain
//! type serialization/deserialization and SQL query construction.
//!
//! ## Type Mapping
//!
//! | Domain Type             | SQL Type | Strategy                              |
//! |--------------------------|----------|----------------------------------------|
//! | `LogicalFileId`          | TEXT     | UUID string via `.to_string()`/`FromStr` |
//! | `ReplicaId`/`FragmentId`/`FolderId` | INTEGER | `i64` via `.as_i64()`/`::new()` |
//! | `AccountId`, `NativeId`  | TEXT     | String via `.as_str()`/`::new()`       |
//! | `SyncPath`, `CalculatedId` | TEXT   | String via `.as_str()`/`::new()`      |
//! | `DateTime<Utc>`          | TEXT     | RFC 3339 via `to_rfc3339()`/`parse_from_rfc3339()` |
//! | `FileStatus`, `Provider`, `AccountState`, `AccountRole` | TEXT | string tags |

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use cloudweave_core::domain::{
    AccountId, AccountRole, AccountState, CalculatedId, FileStatus, Folder, FolderId,
    FragmentId, LogicalFile, LogicalFileId, NativeHash, NativeId, Provider, Replica,
    ReplicaFragment, ReplicaId, SyncPath, UserAccount,
};
use cloudweave_core::ports::{MetadataStore, ProviderUsage, ReplicaFilter};

use crate::StoreError;

/// SQLite-based implementation of the metadata store port
pub struct SqliteMetadataStore {
    pool: SqlitePool,
}

impl SqliteMetadataStore {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// String<->enum helpers
// ============================================================================

fn provider_to_string(p: Provider) -> &'static str {
    match p {
        Provider::Google => "google",
        Provider::Microsoft => "microsoft",
        Provider::Telegram => "telegram",
    }
}

fn provider_from_string(s: &str) -> Result<Provider, StoreError> {
    match s {
        "google" => Ok(Provider::Google),
        "microsoft" => Ok(Provider::Microsoft),
        "telegram" => Ok(Provider::Telegram),
        other => Err(StoreError::SerializationError(format!("unknown provider: {other}"))),
    }
}

fn role_to_string(r: AccountRole) -> &'static str {
    match r {
        AccountRole::Main => "main",
        AccountRole::Backup => "backup",
    }
}

fn role_from_string(s: &str) -> Result<AccountRole, StoreError> {
    match s {
        "main" => Ok(AccountRole::Main),
        "backup" => Ok(AccountRole::Backup),
        other => Err(StoreError::SerializationError(format!("unknown account role: {other}"))),
    }
}

fn account_state_to_string(s: &AccountState) -> String {
    match s {
        AccountState::Active => "active".to_string(),
        AccountState::TokenExpired => "token_expired".to_string(),
        AccountState::Suspended => "suspended".to_string(),
        AccountState::Error(msg) => format!("error:{msg}"),
    }
}

fn account_state_from_string(s: &str) -> AccountState {
    match s {
        "active" => AccountState::Active,
        "token_expired" => AccountState::TokenExpired,
        "suspended" => AccountState::Suspended,
        other if other.starts_with("error:") => AccountState::Error(other[6..].to_string()),
        other => AccountState::Error(format!("unrecognized stored state: {other}")),
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::SerializationError(format!("failed to parse datetime '{s}': {e}")))
}

// ============================================================================
// Row mapping
// ============================================================================

fn account_from_row(row: &SqliteRow) -> Result<UserAccount, StoreError> {
    let id: String = row.get("id");
    let provider: String = row.get("provider");
    let role: String = row.get("role");
    let display_name: String = row.get("display_name");
    let quota_used: i64 = row.get("quota_used");
    let quota_total: i64 = row.get("quota_total");
    let state: String = row.get("state");
    let created_at: String = row.get("created_at");

    Ok(UserAccount::from_parts(
        AccountId::new(id).map_err(|e| StoreError::SerializationError(e.to_string()))?,
        provider_from_string(&provider)?,
        role_from_string(&role)?,
        display_name,
        quota_used as u64,
        quota_total as u64,
        account_state_from_string(&state),
        parse_datetime(&created_at)?,
    ))
}

fn file_status_from_str(s: &str) -> Result<FileStatus, StoreError> {
    s.parse().map_err(|e: cloudweave_core::domain::DomainError| StoreError::SerializationError(e.to_string()))
}

fn logical_file_from_row(row: &SqliteRow) -> Result<LogicalFile, StoreError> {
    let id: String = row.get("id");
    let path: String = row.get("path");
    let name: String = row.get("name");
    let size: i64 = row.get("size");
    let calculated_id: String = row.get("calculated_id");
    let mod_time: String = row.get("mod_time");
    let status: String = row.get("status");

    Ok(LogicalFile::from_parts(
        LogicalFileId::from_str(&id).map_err(|e| StoreError::SerializationError(e.to_string()))?,
        SyncPath::new(path).map_err(|e| StoreError::SerializationError(e.to_string()))?,
        name,
        size as u64,
        CalculatedId::from(calculated_id),
        parse_datetime(&mod_time)?,
        file_status_from_str(&status)?,
    ))
}

fn replica_from_row(row: &SqliteRow) -> Result<Replica, StoreError> {
    let id: i64 = row.get("id");
    let file_id: Option<String> = row.get("file_id");
    let calculated_id: String = row.get("calculated_id");
    let path: String = row.get("path");
    let name: String = row.get("name");
    let size: i64 = row.get("size");
    let provider: String = row.get("provider");
    let account_id: String = row.get("account_id");
    let native_id: String = row.get("native_id");
    let native_hash: Option<String> = row.get("native_hash");
    let mod_time: String = row.get("mod_time");
    let status: String = row.get("status");

    let logical_file_id = match file_id {
        Some(ref s) => LogicalFileId::from_str(s).map_err(|e| StoreError::SerializationError(e.to_string()))?,
        // Orphaned replicas carry a nil placeholder until link/promote runs.
        None => LogicalFileId::from_uuid(uuid::Uuid::nil()),
    };

    Ok(Replica::from_parts(
        ReplicaId::new(id),
        logical_file_id,
        AccountId::new(account_id).map_err(|e| StoreError::SerializationError(e.to_string()))?,
        provider_from_string(&provider)?,
        NativeId::new(native_id).map_err(|e| StoreError::SerializationError(e.to_string()))?,
        native_hash.map(NativeHash::new),
        SyncPath::new(path).map_err(|e| StoreError::SerializationError(e.to_string()))?,
        name,
        size as u64,
        CalculatedId::from(calculated_id),
        parse_datetime(&mod_time)?,
        file_status_from_str(&status)?,
    ))
}

fn fragment_from_row(row: &SqliteRow) -> Result<ReplicaFragment, StoreError> {
    let id: i64 = row.get("id");
    let replica_id: i64 = row.get("replica_id");
    let fragment_number: i64 = row.get("fragment_number");
    let size: i64 = row.get("size");
    let native_fragment_id: String = row.get("native_fragment_id");

    Ok(ReplicaFragment::from_parts(
        FragmentId::new(id),
        ReplicaId::new(replica_id),
        fragment_number as u32,
        NativeId::new(native_fragment_id).map_err(|e| StoreError::SerializationError(e.to_string()))?,
        size as u64,
    ))
}

fn folder_from_row(row: &SqliteRow) -> Result<Folder, StoreError> {
    let id: i64 = row.get("id");
    let account_id: String = row.get("account_id");
    let provider: String = row.get("provider");
    // `owner` doubles as the folder's provider-native id; a folder has no
    // separate `owner`-vs-`native_id` distinction the way a shared replica does.
    let native_id: String = row.get("owner");
    let path: String = row.get("path");

    Ok(Folder::from_parts(
        FolderId::new(id),
        AccountId::new(account_id).map_err(|e| StoreError::SerializationError(e.to_string()))?,
        provider_from_string(&provider)?,
        NativeId::new(native_id).map_err(|e| StoreError::SerializationError(e.to_string()))?,
        SyncPath::new(path).map_err(|e| StoreError::SerializationError(e.to_string()))?,
    ))
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn upsert_account(&self, account: &UserAccount) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO accounts (id, provider, role, display_name, quota_used, quota_total, state, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
               role = excluded.role,
               display_name = excluded.display_name,
               quota_used = excluded.quota_used,
               quota_total = excluded.quota_total,
               state = excluded.state",
        )
        .bind(account.id().as_str())
        .bind(provider_to_string(account.provider()))
        .bind(role_to_string(account.role()))
        .bind(account.display_name())
        .bind(account.quota_used() as i64)
        .bind(account.quota_total() as i64)
        .bind(account_state_to_string(account.state()))
        .bind(account.created_at().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_account(&self, id: &AccountId) -> anyhow::Result<Option<UserAccount>> {
        let row = sqlx::query("SELECT * FROM accounts WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| account_from_row(&r)).transpose().map_err(Into::into)
    }

    async fn list_accounts(&self) -> anyhow::Result<Vec<UserAccount>> {
        let rows = sqlx::query("SELECT * FROM accounts").fetch_all(&self.pool).await?;
        rows.iter().map(account_from_row).collect::<Result<_, _>>().map_err(Into::into)
    }

    async fn list_accounts_by_provider(&self, provider: Provider) -> anyhow::Result<Vec<UserAccount>> {
        let rows = sqlx::query("SELECT * FROM accounts WHERE provider = ?")
            .bind(provider_to_string(provider))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(account_from_row).collect::<Result<_, _>>().map_err(Into::into)
    }

    async fn get_logical_file(&self, id: LogicalFileId) -> anyhow::Result<Option<LogicalFile>> {
        let row = sqlx::query("SELECT * FROM files WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| logical_file_from_row(&r)).transpose().map_err(Into::into)
    }

    async fn find_logical_file_by_calculated_id(
        &self,
        calculated_id: &CalculatedId,
    ) -> anyhow::Result<Option<LogicalFile>> {
        let row = sqlx::query("SELECT * FROM files WHERE calculated_id = ? LIMIT 1")
            .bind(calculated_id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| logical_file_from_row(&r)).transpose().map_err(Into::into)
    }

    async fn list_logical_files(&self) -> anyhow::Result<Vec<LogicalFile>> {
        let rows = sqlx::query("SELECT * FROM files").fetch_all(&self.pool).await?;
        rows.iter().map(logical_file_from_row).collect::<Result<_, _>>().map_err(Into::into)
    }

    async fn upsert_logical_file(&self, file: &LogicalFile) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO files (id, path, name, size, calculated_id, mod_time, status)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
               path = excluded.path,
               name = excluded.name,
               size = excluded.size,
               calculated_id = excluded.calculated_id,
               mod_time = excluded.mod_time,
               status = excluded.status",
        )
        .bind(file.id().to_string())
        .bind(file.path().as_str())
        .bind(file.name())
        .bind(file.size() as i64)
        .bind(file.calculated_id().as_str())
        .bind(file.mod_time().to_rfc3339())
        .bind(file.status().name())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_replicas(&self, filter: &ReplicaFilter) -> anyhow::Result<Vec<Replica>> {
        let mut sql = "SELECT * FROM replicas WHERE 1=1".to_string();
        if filter.account_id.is_some() {
            sql.push_str(" AND account_id = ?");
        }
        if filter.provider.is_some() {
            sql.push_str(" AND provider = ?");
        }
        if filter.path_prefix.is_some() {
            sql.push_str(" AND path LIKE ?");
        }
        if filter.calculated_id.is_some() {
            sql.push_str(" AND calculated_id = ?");
        }
        if filter.modified_since.is_some() {
            sql.push_str(" AND mod_time >= ?");
        }

        let mut query = sqlx::query(&sql);
        if let Some(ref account_id) = filter.account_id {
            query = query.bind(account_id.as_str());
        }
        if let Some(provider) = filter.provider {
            query = query.bind(provider_to_string(provider));
        }
        if let Some(ref prefix) = filter.path_prefix {
            query = query.bind(format!("{}%", prefix.as_str()));
        }
        if let Some(ref calculated_id) = filter.calculated_id {
            query = query.bind(calculated_id.as_str());
        }
        if let Some(since) = filter.modified_since {
            query = query.bind(since.to_rfc3339());
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(replica_from_row).collect::<Result<_, _>>().map_err(Into::into)
    }

    async fn get_replicas_for_logical_file(&self, id: LogicalFileId) -> anyhow::Result<Vec<Replica>> {
        let rows = sqlx::query("SELECT * FROM replicas WHERE file_id = ?")
            .bind(id.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(replica_from_row).collect::<Result<_, _>>().map_err(Into::into)
    }

    async fn batch_upsert_replicas(&self, replicas: &[Replica]) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now().to_rfc3339();

        for replica in replicas {
            let file_id = if replica.logical_file_id().as_uuid().is_nil() {
                None
            } else {
                Some(replica.logical_file_id().to_string())
            };

            sqlx::query(
                "INSERT INTO replicas
                   (file_id, calculated_id, path, name, size, provider, account_id,
                    native_id, native_hash, mod_time, status, fragmented, owner, last_seen_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(provider, account_id, native_id) DO UPDATE SET
                   calculated_id = excluded.calculated_id,
                   path = excluded.path,
                   name = excluded.name,
                   size = excluded.size,
                   native_hash = excluded.native_hash,
                   mod_time = excluded.mod_time,
                   status = excluded.status,
                   fragmented = excluded.fragmented,
                   owner = excluded.owner,
                   last_seen_at = excluded.last_seen_at",
            )
            .bind(file_id)
            .bind(replica.calculated_id().as_str())
            .bind(replica.path().as_str())
            .bind(replica.name())
            .bind(replica.size() as i64)
            .bind(provider_to_string(replica.provider()))
            .bind(replica.account_id().as_str())
            .bind(replica.native_id().as_str())
            .bind(replica.native_hash().map(NativeHash::as_str))
            .bind(replica.mod_time().to_rfc3339())
            .bind(replica.status().name())
            .bind(false)
            .bind(replica.account_id().as_str())
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_replica(&self, id: ReplicaId) -> anyhow::Result<()> {
        self.delete_fragments_for_replica(id).await?;
        sqlx::query("DELETE FROM replicas WHERE id = ?")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_fragments_for_replica(&self, replica_id: ReplicaId) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM replica_fragments WHERE replica_id = ?")
            .bind(replica_id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_fragments(&self, fragments: &[ReplicaFragment]) -> anyhow::Result<()> {
        let total = fragments.len() as i64;
        for fragment in fragments {
            sqlx::query(
                "INSERT INTO replica_fragments
                   (replica_id, fragment_number, fragments_total, size, native_fragment_id)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(fragment.replica_id().as_i64())
            .bind(fragment.sequence() as i64)
            .bind(total)
            .bind(fragment.byte_len() as i64)
            .bind(fragment.native_id().as_str())
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn get_fragments_for_replica(&self, replica_id: ReplicaId) -> anyhow::Result<Vec<ReplicaFragment>> {
        let rows = sqlx::query("SELECT * FROM replica_fragments WHERE replica_id = ? ORDER BY fragment_number")
            .bind(replica_id.as_i64())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(fragment_from_row).collect::<Result<_, _>>().map_err(Into::into)
    }

    async fn update_logical_from_latest_replica(&self) -> anyhow::Result<u64> {
        let files = self.list_logical_files().await?;
        let mut updated = 0u64;

        for mut file in files {
            let replicas = self.get_replicas_for_logical_file(file.id()).await?;
            let Some(latest) = replicas
                .iter()
                .filter(|r| r.status().is_active())
                .max_by_key(|r| r.mod_time())
            else {
                continue;
            };

            let before = file.clone();
            file.mirror_from_replica(
                latest.path().clone(),
                latest.name().to_string(),
                latest.size(),
                latest.calculated_id().clone(),
                latest.mod_time(),
            );
            if file != before {
                self.upsert_logical_file(&file).await?;
                updated += 1;
            }
        }

        Ok(updated)
    }

    async fn link_orphaned_replicas(&self) -> anyhow::Result<u64> {
        let rows = sqlx::query("SELECT * FROM replicas WHERE file_id IS NULL")
            .fetch_all(&self.pool)
            .await?;

        let mut linked = 0u64;
        for row in rows {
            let replica = replica_from_row(&row)?;
            let replica_id: i64 = row.get("id");
            let Some(file) = self
                .find_logical_file_by_calculated_id(replica.calculated_id())
                .await?
            else {
                continue;
            };

            sqlx::query("UPDATE replicas SET file_id = ? WHERE id = ?")
                .bind(file.id().to_string())
                .bind(replica_id)
                .execute(&self.pool)
                .await?;
            linked += 1;
        }

        Ok(linked)
    }

    async fn promote_orphaned_replicas(&self) -> anyhow::Result<u64> {
        let rows = sqlx::query("SELECT * FROM replicas WHERE file_id IS NULL")
            .fetch_all(&self.pool)
            .await?;

        let mut by_calculated_id: std::collections::HashMap<String, Vec<i64>> = std::collections::HashMap::new();
        let mut representatives: std::collections::HashMap<String, Replica> = std::collections::HashMap::new();

        for row in &rows {
            let replica = replica_from_row(row)?;
            let replica_id: i64 = row.get("id");
            by_calculated_id
                .entry(replica.calculated_id().as_str().to_string())
                .or_default()
                .push(replica_id);
            representatives
                .entry(replica.calculated_id().as_str().to_string())
                .or_insert(replica);
        }

        let mut promoted = 0u64;
        for (calculated_id, replica_ids) in by_calculated_id {
            let representative = &representatives[&calculated_id];
            let file = LogicalFile::new(
                representative.path().clone(),
                representative.size(),
                representative.mod_time(),
            );
            self.upsert_logical_file(&file).await?;

            for replica_id in replica_ids {
                sqlx::query("UPDATE replicas SET file_id = ? WHERE id = ?")
                    .bind(file.id().to_string())
                    .bind(replica_id)
                    .execute(&self.pool)
                    .await?;
                promoted += 1;
            }
        }

        Ok(promoted)
    }

    async fn mark_stale_deleted(&self, scan_started: DateTime<Utc>) -> anyhow::Result<u64> {
        let result = sqlx::query(
            "UPDATE replicas SET status = 'deleted'
             WHERE last_seen_at < ? AND status != 'deleted'",
        )
        .bind(scan_started.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn upsert_folder(&self, folder: &Folder) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO folders (name, path, provider, account_id, parent_folder_id, owner)
             VALUES (?, ?, ?, ?, NULL, ?)
             ON CONFLICT(provider, account_id, path) DO UPDATE SET
               name = excluded.name,
               owner = excluded.owner",
        )
        .bind(folder.path().file_name())
        .bind(folder.path().as_str())
        .bind(provider_to_string(folder.provider()))
        .bind(folder.account_id().as_str())
        .bind(folder.native_id().as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_folders(&self, account_id: &AccountId) -> anyhow::Result<Vec<Folder>> {
        let rows = sqlx::query("SELECT * FROM folders WHERE account_id = ?")
            .bind(account_id.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(folder_from_row).collect::<Result<_, _>>().map_err(Into::into)
    }

    async fn get_folder(&self, id: FolderId) -> anyhow::Result<Option<Folder>> {
        let row = sqlx::query("SELECT * FROM folders WHERE id = ?")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| folder_from_row(&r)).transpose().map_err(Into::into)
    }

    async fn usage_by_provider(&self) -> anyhow::Result<Vec<(Provider, ProviderUsage)>> {
        let rows = sqlx::query(
            "SELECT provider, COUNT(DISTINCT account_id) as account_count, COALESCE(SUM(size), 0) as used
             FROM replicas
             WHERE status = 'active' AND owner = account_id
             GROUP BY provider",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::new();
        for row in rows {
            let provider_str: String = row.get("provider");
            let account_count: i64 = row.get("account_count");
            let used: i64 = row.get("used");
            out.push((
                provider_from_string(&provider_str)?,
                ProviderUsage {
                    account_id_count: account_count as usize,
                    used_bytes: used as u64,
                    total_bytes: 0,
                },
            ));
        }
        Ok(out)
    }

    async fn duplicate_calculated_ids(&self) -> anyhow::Result<Vec<CalculatedId>> {
        let rows = sqlx::query(
            "SELECT calculated_id FROM files GROUP BY calculated_id HAVING COUNT(*) > 1",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|r| CalculatedId::from(r.get::<String, _>("calculated_id")))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DatabasePool;
    use cloudweave_core::domain::AccountRole;

    async fn setup() -> SqliteMetadataStore {
        let pool = DatabasePool::in_memory().await.expect("in-memory pool");
        SqliteMetadataStore::new(pool.pool().clone())
    }

    fn test_account(id: &str) -> UserAccount {
        UserAccount::new(AccountId::new(id).unwrap(), Provider::Google, AccountRole::Main, "Test")
    }

    #[tokio::test]
    async fn saves_and_retrieves_account() {
        let store = setup().await;
        let account = test_account("acct-1");
        store.upsert_account(&account).await.unwrap();

        let retrieved = store.get_account(account.id()).await.unwrap().unwrap();
        assert_eq!(retrieved.display_name(), "Test");
        assert_eq!(retrieved.provider(), Provider::Google);
    }

    #[tokio::test]
    async fn batch_upsert_replica_then_link_and_promote() {
        let store = setup().await;

        let replica = Replica::new(
            LogicalFileId::from_uuid(uuid::Uuid::nil()),
            AccountId::new("acct-1").unwrap(),
            Provider::Google,
            NativeId::new("native-1").unwrap(),
            None,
            SyncPath::new("a/b.txt").unwrap(),
            100,
            Utc::now(),
        );

        store.batch_upsert_replicas(&[replica]).await.unwrap();
        let promoted = store.promote_orphaned_replicas().await.unwrap();
        assert_eq!(promoted, 1);

        let files = store.list_logical_files().await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].calculated_id().as_str(), "b.txt-100");
    }

    #[tokio::test]
    async fn mark_stale_deleted_flags_replicas_not_seen_since_scan_start() {
        let store = setup().await;
        let mut replica = Replica::new(
            LogicalFileId::from_uuid(uuid::Uuid::nil()),
            AccountId::new("acct-1").unwrap(),
            Provider::Google,
            NativeId::new("native-1").unwrap(),
            None,
            SyncPath::new("a.txt").unwrap(),
            10,
            Utc::now(),
        );
        replica.set_status(FileStatus::SoftDeleted);
        store.batch_upsert_replicas(&[replica]).await.unwrap();

        let future = Utc::now() + chrono::Duration::hours(1);
        let affected = store.mark_stale_deleted(future).await.unwrap();
        assert_eq!(affected, 1);

        let replicas = store.list_replicas(&ReplicaFilter::new()).await.unwrap();
        assert_eq!(replicas[0].status(), FileStatus::Deleted);
    }

    #[tokio::test]
    async fn mark_stale_deleted_flags_active_replicas_too() {
        let store = setup().await;
        let replica = Replica::new(
            LogicalFileId::from_uuid(uuid::Uuid::nil()),
            AccountId::new("acct-1").unwrap(),
            Provider::Google,
            NativeId::new("native-1").unwrap(),
            None,
            SyncPath::new("a.txt").unwrap(),
            10,
            Utc::now(),
        );
        assert_eq!(replica.status(), FileStatus::Active);
        store.batch_upsert_replicas(&[replica]).await.unwrap();

        let future = Utc::now() + chrono::Duration::hours(1);
        let affected = store.mark_stale_deleted(future).await.unwrap();
        assert_eq!(affected, 1);

        let replicas = store.list_replicas(&ReplicaFilter::new()).await.unwrap();
        assert_eq!(replicas[0].status(), FileStatus::Deleted);
    }
}
