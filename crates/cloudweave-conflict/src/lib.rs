//! Cross-provider conflict detection and resolution (spec I2)
//!
//! Two replicas at the same path with different content fingerprints never
//! overwrite each other: the losing replica's bytes are copied onto the
//! winning provider under a `_conflict_<timestamp>` name and both originals
//! are left alone.

pub mod detector;
pub mod error;
pub mod namer;
pub mod resolver;
pub mod use_cases;

pub use detector::{ConflictDetector, ConflictPair};
pub use error::ConflictError;
pub use namer::ConflictNamer;
pub use resolver::ConflictResolver;
pub use use_cases::{ConflictRunReport, ResolveConflictsUseCase};
