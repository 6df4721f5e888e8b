//! Audit sink — where recorded [`AuditEntry`] rows are durably appended
//!
//! Grounded on the teacher's `IStateRepository::save_audit` boundary
//! (`logger.rs`), but targeting a standalone append-only JSONL file rather
//! than a row in the encrypted metadata store: the audit trail must stay
//! readable (`cloudweave-cli`'s `status`/dry-run reporting) even when a
//! run never touches the store at all, which I6 safe mode does by design.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::entry::AuditEntry;
use crate::error::AuditError;

/// Durable destination for recorded audit entries
#[async_trait::async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditError>;
}

/// Appends one JSON object per line to a file, creating it if absent.
pub struct JsonlAuditSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlAuditSink {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path, write_lock: Mutex::new(()) }
    }
}

#[async_trait::async_trait]
impl AuditSink for JsonlAuditSink {
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        Ok(())
    }
}

/// In-memory sink used by tests and by the CLI's `--dry-run` reporting,
/// which renders the run's entries back to the operator instead of (or in
/// addition to) persisting them.
#[derive(Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl AuditSink for MemoryAuditSink {
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        self.entries.lock().await.push(entry.clone());
        Ok(())
    }
}

/// Fans one `append` call out to every sink in the list, grounded on the
/// same "never let audit persistence break the caller" policy as
/// [`crate::logger::AuditLogger`] — one sink failing does not stop the rest.
pub struct FanOutAuditSink {
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl FanOutAuditSink {
    #[must_use]
    pub fn new(sinks: Vec<Arc<dyn AuditSink>>) -> Self {
        Self { sinks }
    }
}

#[async_trait::async_trait]
impl AuditSink for FanOutAuditSink {
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        for sink in &self.sinks {
            if let Err(e) = sink.append(entry).await {
                tracing::warn!(error = %e, "audit sink failed to append entry");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{AuditAction, AuditResult};

    #[tokio::test]
    async fn jsonl_sink_appends_one_line_per_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let sink = JsonlAuditSink::new(path.clone());

        sink.append(&AuditEntry::new(AuditAction::Replicate, AuditResult::success(), false))
            .await
            .unwrap();
        sink.append(&AuditEntry::new(AuditAction::FolderCreate, AuditResult::success(), true))
            .await
            .unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[tokio::test]
    async fn memory_sink_retains_entries_in_order() {
        let sink = MemoryAuditSink::new();
        sink.append(&AuditEntry::new(AuditAction::Replicate, AuditResult::success(), false)).await.unwrap();
        sink.append(&AuditEntry::new(AuditAction::Error, AuditResult::failed("E", "boom"), false)).await.unwrap();

        let entries = sink.entries().await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, AuditAction::Replicate);
        assert!(entries[1].result.is_failed());
    }

    #[tokio::test]
    async fn fan_out_survives_one_sink_failing() {
        struct AlwaysFails;
        #[async_trait::async_trait]
        impl AuditSink for AlwaysFails {
            async fn append(&self, _entry: &AuditEntry) -> Result<(), AuditError> {
                Err(AuditError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full")))
            }
        }

        let memory = Arc::new(MemoryAuditSink::new());
        let fan_out = FanOutAuditSink::new(vec![Arc::new(AlwaysFails), memory.clone()]);

        fan_out
            .append(&AuditEntry::new(AuditAction::Replicate, AuditResult::success(), false))
            .await
            .unwrap();

        assert_eq!(memory.entries().await.len(), 1);
    }
}
