//! Conflict resolution executor (I2)
//!
//! Resolves a [`crate::detector::ConflictPair`] by streaming the losing
//! replica's bytes straight from its source provider into the master's
//! provider under a conflict-suffixed name, then persisting the new
//! replica. Neither original is touched.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use cloudweave_core::domain::{LogicalFile, Replica};
use cloudweave_core::ports::{Clock, CloudProvider, MetadataStore};

use crate::detector::ConflictPair;
use crate::error::ConflictError;
use crate::namer::ConflictNamer;

/// Applies I2 resolutions against a set of live provider adapters.
pub struct ConflictResolver {
    store: Arc<dyn MetadataStore>,
    providers: HashMap<String, Arc<dyn CloudProvider>>,
    clock: Arc<dyn Clock>,
}

impl ConflictResolver {
    #[must_use]
    pub fn new(
        store: Arc<dyn MetadataStore>,
        providers: HashMap<String, Arc<dyn CloudProvider>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { store, providers, clock }
    }

    fn provider_for(&self, account_id: &str) -> Result<&Arc<dyn CloudProvider>, ConflictError> {
        self.providers
            .get(account_id)
            .ok_or_else(|| ConflictError::UnknownAccount(account_id.to_string()))
    }

    /// Streams `pair.other`'s content onto `pair.master`'s provider as a
    /// renamed copy, and persists it as a brand-new logical file.
    pub async fn resolve(&self, pair: &ConflictPair) -> Result<Replica, ConflictError> {
        let source = self.provider_for(pair.other.account_id().as_str())?;
        let destination = self.provider_for(pair.master.account_id().as_str())?;

        let conflict_name = ConflictNamer::new(&*self.clock).generate(pair.other.name());
        let parent = pair.master.path().parent().unwrap_or_else(|| pair.master.path().clone());

        info!(
            path = %pair.master.path(),
            conflict_name,
            source = %pair.other.provider(),
            destination = %pair.master.provider(),
            "Resolving cross-provider conflict"
        );

        let stream = source
            .download(pair.other.native_id())
            .await
            .map_err(|e| ConflictError::ResolutionFailed(format!("download losing replica: {e}")))?;

        let entry = destination
            .upload(&parent, &conflict_name, pair.other.size(), stream)
            .await
            .map_err(|e| ConflictError::ResolutionFailed(format!("upload conflict copy: {e}")))?;

        let logical_file = LogicalFile::new(entry.path.clone(), entry.size, entry.modified);
        self.store
            .upsert_logical_file(&logical_file)
            .await
            .map_err(ConflictError::Storage)?;

        let replica = Replica::new(
            logical_file.id(),
            pair.master.account_id().clone(),
            pair.master.provider(),
            entry.native_id,
            entry.hash,
            entry.path,
            entry.size,
            entry.modified,
        );

        self.store
            .batch_upsert_replicas(std::slice::from_ref(&replica))
            .await
            .map_err(ConflictError::Storage)?;

        info!(
            path = %replica.path(),
            provider = %replica.provider(),
            "Conflict copy created"
        );

        Ok(replica)
    }
}
