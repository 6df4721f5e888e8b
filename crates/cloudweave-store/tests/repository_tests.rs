//! Integration tests for the encrypted metadata store
//!
//! Exercises [`EncryptedStore`] end to end (on-disk encryption, reopen with
//! the right/wrong passphrase) and the [`SqliteMetadataStore`] reconcile
//! pipeline against a close-to-realistic scan result.

use chrono::Utc;
use cloudweave_core::domain::{
    AccountId, AccountRole, CalculatedId, FileStatus, LogicalFileId, NativeId, Provider, Replica,
    UserAccount,
};
use cloudweave_core::ports::{MetadataStore, ReplicaFilter};
use cloudweave_store::{EncryptedStore, SqliteMetadataStore};

fn test_account(id: &str, provider: Provider) -> UserAccount {
    UserAccount::new(AccountId::new(id).unwrap(), provider, AccountRole::Main, "Integration Test")
}

fn scanned_replica(path: &str, size: u64, provider: Provider, account: &str, native_id: &str) -> Replica {
    Replica::new(
        LogicalFileId::from_uuid(uuid::Uuid::nil()),
        AccountId::new(account).unwrap(),
        provider,
        NativeId::new(native_id).unwrap(),
        None,
        cloudweave_core::domain::SyncPath::new(path).unwrap(),
        size,
        Utc::now(),
    )
}

#[tokio::test]
async fn encrypted_store_round_trips_through_real_passphrase() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("metadata.db.enc");

    {
        let store = EncryptedStore::open(&db_path, b"correct horse battery staple")
            .await
            .unwrap();
        let metadata = SqliteMetadataStore::new(store.pool().clone());
        let account = test_account("acct-1", Provider::Google);
        metadata.upsert_account(&account).await.unwrap();
        store.seal().await.unwrap();
    }

    let store = EncryptedStore::open(&db_path, b"correct horse battery staple")
        .await
        .unwrap();
    let metadata = SqliteMetadataStore::new(store.pool().clone());
    let accounts = metadata.list_accounts().await.unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].id().as_str(), "acct-1");
}

#[tokio::test]
async fn encrypted_store_rejects_wrong_passphrase() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("metadata.db.enc");

    {
        let store = EncryptedStore::open(&db_path, b"right passphrase").await.unwrap();
        store.seal().await.unwrap();
    }

    let result = EncryptedStore::open(&db_path, b"wrong passphrase").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn reconcile_pipeline_links_matching_replicas_and_promotes_new_ones() {
    let store = DatabasePoolFixture::new().await;
    let metadata = SqliteMetadataStore::new(store.pool().clone());

    // Two replicas of the same logical file (same name+size) land on
    // different providers in one scan pass, alongside one replica of a
    // file never seen before.
    let replicas = vec![
        scanned_replica("docs/report.pdf", 2048, Provider::Google, "acct-g", "g-1"),
        scanned_replica("docs/report.pdf", 2048, Provider::Microsoft, "acct-m", "m-1"),
        scanned_replica("docs/new-file.bin", 512, Provider::Telegram, "acct-t", "t-1"),
    ];
    metadata.batch_upsert_replicas(&replicas).await.unwrap();

    let promoted = metadata.promote_orphaned_replicas().await.unwrap();
    assert_eq!(promoted, 3, "every distinct calculated_id gets its own logical file on first pass");

    let files = metadata.list_logical_files().await.unwrap();
    assert_eq!(files.len(), 2, "report.pdf's two replicas collapse onto one logical file");

    // A follow-up scan brings in a third replica of report.pdf; it should
    // link to the existing logical file rather than create a new one.
    let follow_up = vec![scanned_replica("docs/report.pdf", 2048, Provider::Telegram, "acct-t", "t-2")];
    metadata.batch_upsert_replicas(&follow_up).await.unwrap();
    let linked = metadata.link_orphaned_replicas().await.unwrap();
    assert_eq!(linked, 1);

    let files_after = metadata.list_logical_files().await.unwrap();
    assert_eq!(files_after.len(), 2, "linking must not create a duplicate logical file");
}

#[tokio::test]
async fn duplicate_calculated_ids_reports_independent_logical_files() {
    let store = DatabasePoolFixture::new().await;
    let metadata = SqliteMetadataStore::new(store.pool().clone());

    // Two unrelated files that happen to share a calculated_id (same name
    // and size by coincidence) and were promoted independently.
    metadata
        .batch_upsert_replicas(&[scanned_replica("a/dup.txt", 64, Provider::Google, "acct-g", "g-1")])
        .await
        .unwrap();
    metadata.promote_orphaned_replicas().await.unwrap();

    metadata
        .batch_upsert_replicas(&[scanned_replica("b/dup.txt", 64, Provider::Microsoft, "acct-m", "m-1")])
        .await
        .unwrap();
    // Different path means this won't link to the first file; a second
    // promote pass creates an independent logical file with the same
    // calculated_id.
    metadata.promote_orphaned_replicas().await.unwrap();

    let duplicates = metadata.duplicate_calculated_ids().await.unwrap();
    assert_eq!(duplicates, vec![CalculatedId::compute("dup.txt", 64)]);
}

#[tokio::test]
async fn usage_by_provider_aggregates_owned_active_replicas() {
    let store = DatabasePoolFixture::new().await;
    let metadata = SqliteMetadataStore::new(store.pool().clone());

    metadata
        .batch_upsert_replicas(&[
            scanned_replica("a.bin", 1000, Provider::Google, "acct-g", "g-1"),
            scanned_replica("b.bin", 2000, Provider::Google, "acct-g", "g-2"),
        ])
        .await
        .unwrap();

    let usage = metadata.usage_by_provider().await.unwrap();
    let google_usage = usage.iter().find(|(p, _)| *p == Provider::Google).unwrap();
    assert_eq!(google_usage.1.used_bytes, 3000);
    assert_eq!(google_usage.1.account_id_count, 1);
}

#[tokio::test]
async fn list_replicas_filters_by_calculated_id() {
    let store = DatabasePoolFixture::new().await;
    let metadata = SqliteMetadataStore::new(store.pool().clone());

    metadata
        .batch_upsert_replicas(&[
            scanned_replica("x.txt", 10, Provider::Google, "acct-g", "g-1"),
            scanned_replica("y.txt", 20, Provider::Google, "acct-g", "g-2"),
        ])
        .await
        .unwrap();

    let filter = ReplicaFilter::new().with_calculated_id(CalculatedId::compute("x.txt", 10));
    let found = metadata.list_replicas(&filter).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name(), "x.txt");
}

#[tokio::test]
async fn soft_deleted_replica_becomes_deleted_after_stale_cutoff() {
    let store = DatabasePoolFixture::new().await;
    let metadata = SqliteMetadataStore::new(store.pool().clone());

    let mut replica = scanned_replica("gone.txt", 5, Provider::Google, "acct-g", "g-1");
    replica.set_status(FileStatus::SoftDeleted);
    metadata.batch_upsert_replicas(&[replica]).await.unwrap();

    let cutoff = Utc::now() + chrono::Duration::seconds(5);
    let affected = metadata.mark_stale_deleted(cutoff).await.unwrap();
    assert_eq!(affected, 1);

    let replicas = metadata.list_replicas(&ReplicaFilter::new()).await.unwrap();
    assert_eq!(replicas[0].status(), FileStatus::Deleted);
}

/// Thin wrapper so tests don't each repeat the in-memory pool boilerplate.
struct DatabasePoolFixture(cloudweave_store::DatabasePool);

impl DatabasePoolFixture {
    async fn new() -> Self {
        Self(cloudweave_store::DatabasePool::in_memory().await.unwrap())
    }

    fn pool(&self) -> &sqlx::SqlitePool {
        self.0.pool()
    }
}
