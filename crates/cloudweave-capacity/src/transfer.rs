//! The `transfer_or_copy` state machine (spec §4.5)
//!
//! Tries the provider's native ownership transfer first; falls back to a
//! streamed copy onto the destination account followed by deleting the
//! original only once every other step has already succeeded.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use cloudweave_core::domain::{AccountId, Replica, TransferOutcome};
use cloudweave_core::ports::{CloudProvider, MetadataStore};

use crate::error::CapacityError;

fn provider_for<'a>(
    providers: &'a HashMap<AccountId, Arc<dyn CloudProvider>>,
    account_id: &AccountId,
) -> Result<&'a Arc<dyn CloudProvider>, CapacityError> {
    providers
        .get(account_id)
        .ok_or_else(|| CapacityError::UnknownAccount(account_id.to_string()))
}

/// Moves `replica` from its current account onto `dst_account`, preferring
/// a native ownership transfer and falling back to copy-then-delete.
///
/// Returns the replica as it now stands in the store on success. The
/// caller is responsible for tracking consecutive failures per source
/// account; this function reports one attempt only.
pub async fn transfer_or_copy(
    store: &Arc<dyn MetadataStore>,
    providers: &HashMap<AccountId, Arc<dyn CloudProvider>>,
    replica: &Replica,
    dst_account: &AccountId,
) -> Result<Replica, CapacityError> {
    let src_account = replica.account_id().clone();
    let src_provider = provider_for(providers, &src_account)?;
    let dst_provider = provider_for(providers, dst_account)?;

    let native_outcome = src_provider.transfer_ownership(replica.native_id(), dst_account.as_str()).await;

    match native_outcome {
        Ok(TransferOutcome::Transferred) => {
            return finish_native_transfer(store, replica, dst_account).await;
        }
        Ok(TransferOutcome::Pending) => {
            if dst_provider.accept_pending_ownership(replica.native_id()).await.is_ok() {
                return finish_native_transfer(store, replica, dst_account).await;
            }
            warn!(
                path = %replica.path(),
                "pending ownership transfer was not accepted, falling back to copy"
            );
        }
        Ok(TransferOutcome::Unsupported | TransferOutcome::ConsentRequired) => {}
        Ok(TransferOutcome::Error(reason)) => {
            warn!(path = %replica.path(), reason, "native transfer refused, falling back to copy");
        }
        Err(e) => {
            warn!(path = %replica.path(), error = %e, "native transfer call failed, falling back to copy");
        }
    }

    copy_then_delete(store, src_provider, dst_provider, replica, dst_account).await
}

async fn finish_native_transfer(
    store: &Arc<dyn MetadataStore>,
    replica: &Replica,
    dst_account: &AccountId,
) -> Result<Replica, CapacityError> {
    let mut updated = replica.clone();
    updated.set_account_id(dst_account.clone());
    replace_replica_row(store, replica, &updated).await?;

    info!(path = %updated.path(), destination = %dst_account, "ownership transferred natively");
    Ok(updated)
}

/// Retires `old`'s store row and upserts `new` in its place.
///
/// `(provider, account_id, native_id)` is the store's unique key
/// (`repository.rs`'s `ON CONFLICT`), so once a transfer changes either
/// field `batch_upsert_replicas` alone inserts a second row instead of
/// updating the first — the old identity has to be deleted explicitly.
async fn replace_replica_row(
    store: &Arc<dyn MetadataStore>,
    old: &Replica,
    new: &Replica,
) -> Result<(), CapacityError> {
    let identity_changed = old.account_id() != new.account_id() || old.native_id() != new.native_id();
    if old.id().as_i64() != 0 && identity_changed {
        store.delete_replica(old.id()).await.map_err(CapacityError::Storage)?;
    }
    store
        .batch_upsert_replicas(std::slice::from_ref(new))
        .await
        .map_err(CapacityError::Storage)
}

async fn copy_then_delete(
    store: &Arc<dyn MetadataStore>,
    src_provider: &Arc<dyn CloudProvider>,
    dst_provider: &Arc<dyn CloudProvider>,
    replica: &Replica,
    dst_account: &AccountId,
) -> Result<Replica, CapacityError> {
    if let Some(parent) = replica.path().parent() {
        dst_provider.create_folder(&parent).await.map_err(|e| transfer_failed(replica, dst_account, e))?;
    }

    let stream = src_provider
        .download(replica.native_id())
        .await
        .map_err(|e| transfer_failed(replica, dst_account, e))?;

    let entry = dst_provider
        .upload(&replica.path().parent().unwrap_or_else(|| replica.path().clone()), replica.name(), replica.size(), stream)
        .await
        .map_err(|e| transfer_failed(replica, dst_account, e))?;

    let mut updated = replica.clone();
    updated.set_account_id(dst_account.clone());
    updated.set_native_id(entry.native_id);

    match src_provider.delete(replica.native_id()).await {
        Ok(()) => {
            replace_replica_row(store, replica, &updated).await?;
            info!(path = %updated.path(), destination = %dst_account, "copied and deleted original");
        }
        Err(e) => {
            warn!(
                path = %updated.path(),
                error = %e,
                "copy succeeded but deleting the original failed, leaving both replicas in the store"
            );
            let mut orphan_copy = updated.clone();
            orphan_copy.assign_id(cloudweave_core::domain::ReplicaId::new(0));
            store
                .batch_upsert_replicas(std::slice::from_ref(&orphan_copy))
                .await
                .map_err(CapacityError::Storage)?;
        }
    }

    Ok(updated)
}

fn transfer_failed(replica: &Replica, dst_account: &AccountId, e: anyhow::Error) -> CapacityError {
    CapacityError::TransferFailed {
        path: replica.path().to_string(),
        source: replica.account_id().to_string(),
        destination: dst_account.to_string(),
        reason: e.to_string(),
    }
}
