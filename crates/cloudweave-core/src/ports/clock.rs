//! Clock port
//!
//! Every timestamp the engines read comes through this trait rather than
//! `Utc::now()` directly, so the seeded scenario tests (spec §8) can pin time
//! and get the exact `_conflict_YYYY-MM-DD_HH-MM-SS` names the invariants
//! require.

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock [`Clock`] used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fixed-time [`Clock`] for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
