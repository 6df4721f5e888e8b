//! Conflict use case - orchestrates detection and resolution for one run
//!
//! The sync engine calls this once per pass, after soft-delete convergence,
//! with every active replica it has just reconciled from the metadata
//! store (spec's deterministic per-run order: soft-delete convergence →
//! missing copies + conflict handling → folder skeleton → M-shortcuts).

use cloudweave_core::domain::Replica;

use crate::detector::{ConflictDetector, ConflictPair};
use crate::resolver::ConflictResolver;

/// Result of running conflict resolution for one sync pass.
#[derive(Debug, Default)]
pub struct ConflictRunReport {
    pub resolved: Vec<Replica>,
    pub failed: Vec<(ConflictPair, String)>,
}

impl ConflictRunReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Detects and resolves every I2 conflict among the given replicas.
pub struct ResolveConflictsUseCase {
    resolver: ConflictResolver,
}

impl ResolveConflictsUseCase {
    #[must_use]
    pub fn new(resolver: ConflictResolver) -> Self {
        Self { resolver }
    }

    /// Runs detection over `replicas`, then resolves every pair found.
    /// A single pair's failure does not stop the rest (matches the
    /// log-and-continue-per-file propagation policy).
    pub async fn run(&self, replicas: &[Replica]) -> ConflictRunReport {
        let pairs = ConflictDetector::find(replicas);
        let mut report = ConflictRunReport::default();

        for pair in pairs {
            match self.resolver.resolve(&pair).await {
                Ok(replica) => report.resolved.push(replica),
                Err(e) => report.failed.push((pair, e.to_string())),
            }
        }

        report
    }
}
