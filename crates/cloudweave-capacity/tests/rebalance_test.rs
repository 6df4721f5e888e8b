//! Scenario tests for the free-main and fallback-transfer seeded cases
//! (spec §8 scenarios 5 and 6).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::{AsyncRead, AsyncReadExt};

use cloudweave_capacity::CapacityEngine;
use cloudweave_core::config::CapacityConfig;
use cloudweave_core::domain::{
    AccountId, AccountRole, CalculatedId, FileStatus, Folder, FolderId, LogicalFile, LogicalFileId,
    NativeHash, NativeId, Provider, Replica, ReplicaFragment, ReplicaId, SyncPath, TransferOutcome,
    UserAccount,
};
use cloudweave_core::ports::{CloudProvider, MetadataStore, ProviderUsage, QuotaInfo, RemoteEntry, ReplicaFilter};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TransferBehavior {
    Pending,
    ConsentRequired,
}

struct FakeProvider {
    provider: Provider,
    behavior: TransferBehavior,
    blobs: Mutex<HashMap<String, Vec<u8>>>,
    accepted: Mutex<bool>,
}

impl FakeProvider {
    fn new(provider: Provider, behavior: TransferBehavior) -> Self {
        Self { provider, behavior, blobs: Mutex::new(HashMap::new()), accepted: Mutex::new(false) }
    }

    fn seed_blob(&self, native_id: &str, bytes: Vec<u8>) {
        self.blobs.lock().unwrap().insert(native_id.to_string(), bytes);
    }
}

#[async_trait]
impl CloudProvider for FakeProvider {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn preflight(&self) -> anyhow::Result<NativeId> {
        NativeId::new("root")
    }

    async fn share_folder(&self, _folder_id: &NativeId, _account: &str) -> anyhow::Result<()> {
        Ok(())
    }

    async fn check_share(&self, _folder_id: &NativeId, _account: &str) -> anyhow::Result<bool> {
        Ok(true)
    }

    async fn list_changes(&self) -> anyhow::Result<Vec<RemoteEntry>> {
        Ok(Vec::new())
    }

    async fn download(&self, native_id: &NativeId) -> anyhow::Result<Box<dyn AsyncRead + Send + Unpin>> {
        let bytes = self.blobs.lock().unwrap().get(native_id.as_str()).cloned().unwrap_or_default();
        Ok(Box::new(std::io::Cursor::new(bytes)))
    }

    async fn upload(
        &self,
        _parent: &SyncPath,
        name: &str,
        size: u64,
        mut data: Box<dyn AsyncRead + Send + Unpin>,
    ) -> anyhow::Result<RemoteEntry> {
        let mut bytes = Vec::new();
        data.read_to_end(&mut bytes).await?;
        let native_id = format!("copy-{name}");
        self.blobs.lock().unwrap().insert(native_id.clone(), bytes);
        Ok(RemoteEntry {
            native_id: NativeId::new(native_id).unwrap(),
            parent_native_id: None,
            name: name.to_string(),
            path: SyncPath::new(name).unwrap(),
            size,
            hash: Some(NativeHash::new("fake-hash")),
            modified: Utc::now(),
            is_folder: false,
            is_deleted: false,
        })
    }

    async fn create_folder(&self, _path: &SyncPath) -> anyhow::Result<()> {
        Ok(())
    }

    async fn move_item(&self, _native_id: &NativeId, _destination: &SyncPath) -> anyhow::Result<()> {
        Ok(())
    }

    async fn delete(&self, native_id: &NativeId) -> anyhow::Result<()> {
        self.blobs.lock().unwrap().remove(native_id.as_str());
        Ok(())
    }

    async fn quota(&self) -> anyhow::Result<QuotaInfo> {
        Ok(QuotaInfo { used_bytes: 0, total_bytes: 0 })
    }

    async fn transfer_ownership(
        &self,
        _native_id: &NativeId,
        _recipient_account_id: &str,
    ) -> anyhow::Result<TransferOutcome> {
        match self.behavior {
            TransferBehavior::Pending => Ok(TransferOutcome::Pending),
            TransferBehavior::ConsentRequired => Ok(TransferOutcome::ConsentRequired),
        }
    }

    async fn accept_pending_ownership(&self, _native_id: &NativeId) -> anyhow::Result<()> {
        *self.accepted.lock().unwrap() = true;
        Ok(())
    }
}

#[derive(Default)]
struct FakeStore {
    accounts: Mutex<HashMap<AccountId, UserAccount>>,
    replicas: Mutex<HashMap<ReplicaId, Replica>>,
    next_id: Mutex<i64>,
}

#[async_trait]
impl MetadataStore for FakeStore {
    async fn upsert_account(&self, account: &UserAccount) -> anyhow::Result<()> {
        self.accounts.lock().unwrap().insert(account.id().clone(), account.clone());
        Ok(())
    }

    async fn get_account(&self, id: &AccountId) -> anyhow::Result<Option<UserAccount>> {
        Ok(self.accounts.lock().unwrap().get(id).cloned())
    }

    async fn list_accounts(&self) -> anyhow::Result<Vec<UserAccount>> {
        Ok(self.accounts.lock().unwrap().values().cloned().collect())
    }

    async fn list_accounts_by_provider(&self, provider: Provider) -> anyhow::Result<Vec<UserAccount>> {
        Ok(self.accounts.lock().unwrap().values().filter(|a| a.provider() == provider).cloned().collect())
    }

    async fn get_logical_file(&self, _id: LogicalFileId) -> anyhow::Result<Option<LogicalFile>> {
        unimplemented!("not exercised by capacity engine tests")
    }

    async fn find_logical_file_by_calculated_id(
        &self,
        _calculated_id: &CalculatedId,
    ) -> anyhow::Result<Option<LogicalFile>> {
        unimplemented!("not exercised by capacity engine tests")
    }

    async fn list_logical_files(&self) -> anyhow::Result<Vec<LogicalFile>> {
        Ok(Vec::new())
    }

    async fn upsert_logical_file(&self, _file: &LogicalFile) -> anyhow::Result<()> {
        unimplemented!("not exercised by capacity engine tests")
    }

    async fn list_replicas(&self, filter: &ReplicaFilter) -> anyhow::Result<Vec<Replica>> {
        let replicas = self.replicas.lock().unwrap();
        Ok(replicas
            .values()
            .filter(|r| filter.account_id.as_ref().map_or(true, |a| a == r.account_id()))
            .cloned()
            .collect())
    }

    async fn get_replicas_for_logical_file(&self, _id: LogicalFileId) -> anyhow::Result<Vec<Replica>> {
        Ok(Vec::new())
    }

    async fn batch_upsert_replicas(&self, replicas: &[Replica]) -> anyhow::Result<()> {
        let mut store = self.replicas.lock().unwrap();
        let mut next_id = self.next_id.lock().unwrap();
        for replica in replicas {
            let mut replica = replica.clone();
            if replica.id().as_i64() == 0 {
                *next_id += 1;
                replica.assign_id(ReplicaId::new(*next_id));
            }
            store.insert(replica.id(), replica);
        }
        Ok(())
    }

    async fn delete_replica(&self, id: ReplicaId) -> anyhow::Result<()> {
        self.replicas.lock().unwrap().remove(&id);
        Ok(())
    }

    async fn delete_fragments_for_replica(&self, _replica_id: ReplicaId) -> anyhow::Result<()> {
        Ok(())
    }

    async fn insert_fragments(&self, _fragments: &[ReplicaFragment]) -> anyhow::Result<()> {
        Ok(())
    }

    async fn get_fragments_for_replica(&self, _replica_id: ReplicaId) -> anyhow::Result<Vec<ReplicaFragment>> {
        Ok(Vec::new())
    }

    async fn update_logical_from_latest_replica(&self) -> anyhow::Result<u64> {
        Ok(0)
    }

    async fn link_orphaned_replicas(&self) -> anyhow::Result<u64> {
        Ok(0)
    }

    async fn promote_orphaned_replicas(&self) -> anyhow::Result<u64> {
        Ok(0)
    }

    async fn mark_stale_deleted(&self, _scan_started: DateTime<Utc>) -> anyhow::Result<u64> {
        Ok(0)
    }

    async fn upsert_folder(&self, _folder: &Folder) -> anyhow::Result<()> {
        Ok(())
    }

    async fn list_folders(&self, _account_id: &AccountId) -> anyhow::Result<Vec<Folder>> {
        Ok(Vec::new())
    }

    async fn get_folder(&self, _id: FolderId) -> anyhow::Result<Option<Folder>> {
        Ok(None)
    }

    async fn usage_by_provider(&self) -> anyhow::Result<Vec<(Provider, ProviderUsage)>> {
        Ok(Vec::new())
    }

    async fn duplicate_calculated_ids(&self) -> anyhow::Result<Vec<CalculatedId>> {
        Ok(Vec::new())
    }
}

const GIB: u64 = 1024 * 1024 * 1024;

fn account(id: &str, role: AccountRole, used: u64, total: u64) -> UserAccount {
    let mut acc = UserAccount::new(AccountId::new(id).unwrap(), Provider::Google, role, id);
    acc.set_quota(used, total);
    acc
}

fn replica(account_id: &str, native_id: &str, path: &str, size: u64) -> Replica {
    Replica::new(
        LogicalFileId::new(),
        AccountId::new(account_id).unwrap(),
        Provider::Google,
        NativeId::new(native_id).unwrap(),
        None,
        SyncPath::new(path).unwrap(),
        size,
        Utc::now(),
    )
}

fn config() -> CapacityConfig {
    CapacityConfig { high_watermark_percent: 95, target_watermark_percent: 90, max_consecutive_failures: 2 }
}

/// Scenario 5: free-main via a Pending native transfer, accepted by the backup.
#[tokio::test]
async fn free_main_pending_transfer_moves_ownership() {
    let total = 32 * GIB;
    let main = account("main", AccountRole::Main, (total as f64 * 0.97) as u64, total);
    let backup = account("backup", AccountRole::Backup, (total as f64 * 0.10) as u64, total);

    let store: Arc<dyn MetadataStore> = Arc::new(FakeStore::default());
    store.upsert_account(&main).await.unwrap();
    store.upsert_account(&backup).await.unwrap();

    let file = replica("main", "native-1", "/r/big.bin", GIB);
    store.batch_upsert_replicas(std::slice::from_ref(&file)).await.unwrap();

    let main_provider = Arc::new(FakeProvider::new(Provider::Google, TransferBehavior::Pending));
    let backup_provider = Arc::new(FakeProvider::new(Provider::Google, TransferBehavior::Pending));

    let mut providers: HashMap<AccountId, Arc<dyn CloudProvider>> = HashMap::new();
    providers.insert(AccountId::new("main").unwrap(), main_provider);
    providers.insert(AccountId::new("backup").unwrap(), backup_provider.clone());

    let engine = CapacityEngine::new(store.clone(), providers, config());
    let report = engine.free_main(Provider::Google).await.unwrap();

    assert_eq!(report.files_moved, 1);
    assert!(*backup_provider.accepted.lock().unwrap());

    let moved = store.list_replicas(&ReplicaFilter::new()).await.unwrap();
    assert_eq!(moved.len(), 1);
    assert_eq!(moved[0].account_id().as_str(), "backup");
}

/// Scenario 6: native transfer refused with `ConsentRequired`, so capacity
/// falls back to copy-then-delete.
#[tokio::test]
async fn fallback_transfer_copies_then_deletes_original() {
    let total = 32 * GIB;
    let main = account("main", AccountRole::Main, (total as f64 * 0.97) as u64, total);
    let backup = account("backup", AccountRole::Backup, (total as f64 * 0.10) as u64, total);

    let store: Arc<dyn MetadataStore> = Arc::new(FakeStore::default());
    store.upsert_account(&main).await.unwrap();
    store.upsert_account(&backup).await.unwrap();

    let file = replica("main", "native-1", "/r/big.bin", GIB);
    store.batch_upsert_replicas(std::slice::from_ref(&file)).await.unwrap();

    let main_provider = Arc::new(FakeProvider::new(Provider::Google, TransferBehavior::ConsentRequired));
    main_provider.seed_blob("native-1", vec![7u8; 16]);
    let backup_provider = Arc::new(FakeProvider::new(Provider::Google, TransferBehavior::ConsentRequired));

    let mut providers: HashMap<AccountId, Arc<dyn CloudProvider>> = HashMap::new();
    providers.insert(AccountId::new("main").unwrap(), main_provider.clone());
    providers.insert(AccountId::new("backup").unwrap(), backup_provider.clone());

    let engine = CapacityEngine::new(store.clone(), providers, config());
    let report = engine.free_main(Provider::Google).await.unwrap();

    assert_eq!(report.files_moved, 1);
    assert!(main_provider.blobs.lock().unwrap().get("native-1").is_none(), "original must be deleted");

    let replicas = store.list_replicas(&ReplicaFilter::new()).await.unwrap();
    assert_eq!(replicas.len(), 1);
    assert_eq!(replicas[0].account_id().as_str(), "backup");
    assert_eq!(replicas[0].native_id().as_str(), "copy-big.bin");
}

/// Free-main fails up (moves nothing) when backups can't cover main's usage.
#[tokio::test]
async fn free_main_aborts_when_backups_cannot_cover_usage() {
    let total = 32 * GIB;
    let main = account("main", AccountRole::Main, (total as f64 * 0.97) as u64, total);
    let backup = account("backup", AccountRole::Backup, (total as f64 * 0.99) as u64, total);

    let store: Arc<dyn MetadataStore> = Arc::new(FakeStore::default());
    store.upsert_account(&main).await.unwrap();
    store.upsert_account(&backup).await.unwrap();

    let file = replica("main", "native-1", "/r/big.bin", GIB);
    store.batch_upsert_replicas(std::slice::from_ref(&file)).await.unwrap();

    let main_provider = Arc::new(FakeProvider::new(Provider::Google, TransferBehavior::Pending));
    let backup_provider = Arc::new(FakeProvider::new(Provider::Google, TransferBehavior::Pending));

    let mut providers: HashMap<AccountId, Arc<dyn CloudProvider>> = HashMap::new();
    providers.insert(AccountId::new("main").unwrap(), main_provider);
    providers.insert(AccountId::new("backup").unwrap(), backup_provider);

    let engine = CapacityEngine::new(store.clone(), providers, config());
    let report = engine.free_main(Provider::Google).await.unwrap();

    assert_eq!(report.files_moved, 0);
    assert_eq!(report.failures.len(), 1);

    let replicas = store.list_replicas(&ReplicaFilter::new()).await.unwrap();
    assert_eq!(replicas[0].account_id().as_str(), "main");
}
