//! Cross-provider sync engine (spec §4.4, invariants I1-I6)
//!
//! Runs four passes in the fixed order the concurrency model requires:
//! soft-delete convergence (I3), missing-replica replication (I1) together
//! with conflict resolution (I2), folder-skeleton mirroring (I5), then
//! cross-account Microsoft shortcuts. I6 safe mode runs the same passes but
//! asks [`cloudweave_audit::AuditLogger`] before every mutating provider
//! call and skips it when safe mode is on, logging either way.

pub mod engine;
pub mod error;
pub mod folder_skeleton;
pub mod replication;
pub mod shortcuts;
pub mod soft_delete;

pub use engine::{SyncEngine, SyncReport};
pub use error::SyncError;
