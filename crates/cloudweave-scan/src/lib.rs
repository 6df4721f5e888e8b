//! Parallel fan-out scanner and store reconciler (spec §4.3)
//!
//! Walks every configured account's whole tree on every run (no delta
//! cursor), batches the results into the metadata store, then runs the
//! fixed-order reconcile pipeline that stabilizes logical file identity,
//! links/promotes orphaned replicas, tombstones stale rows, and propagates
//! Google-authoritative hard deletes.

pub mod error;
pub mod reconciler;
pub mod scanner;

pub use error::ScanError;
pub use reconciler::{Reconciler, ReconcileReport};
pub use scanner::{Scanner, ScanReport};
