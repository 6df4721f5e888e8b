//! Conflict naming for the rename-on-conflict resolution path (I2)
//!
//! Generates the name a conflicting replica's renamed copy gets on the
//! opposite provider: the original stem with `_conflict_YYYY-MM-DD_HH-MM-SS`
//! inserted before the extension. The timestamp comes from a
//! [`cloudweave_core::ports::Clock`] rather than `Utc::now()` directly so a
//! run's conflict names are reproducible in the seeded scenario tests.

use cloudweave_core::ports::Clock;

/// Generates conflict-copy file names from a shared clock.
pub struct ConflictNamer<'a> {
    clock: &'a dyn Clock,
}

impl<'a> ConflictNamer<'a> {
    #[must_use]
    pub fn new(clock: &'a dyn Clock) -> Self {
        Self { clock }
    }

    /// Given `"report.docx"`, produces `"report_conflict_2026-02-07_14-30-00.docx"`.
    #[must_use]
    pub fn generate(&self, original_name: &str) -> String {
        let timestamp = self.clock.now().format("%Y-%m-%d_%H-%M-%S");

        if let Some(dot_pos) = original_name.rfind('.') {
            let stem = &original_name[..dot_pos];
            let ext = &original_name[dot_pos..];
            format!("{stem}_conflict_{timestamp}{ext}")
        } else {
            format!("{original_name}_conflict_{timestamp}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use cloudweave_core::ports::FixedClock;

    fn clock_at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap())
    }

    #[test]
    fn inserts_timestamp_before_extension() {
        let clock = clock_at(2024, 5, 1, 12, 0, 0);
        let namer = ConflictNamer::new(&clock);
        assert_eq!(namer.generate("x.bin"), "x_conflict_2024-05-01_12-00-00.bin");
    }

    #[test]
    fn appends_timestamp_when_no_extension() {
        let clock = clock_at(2024, 5, 1, 12, 0, 0);
        let namer = ConflictNamer::new(&clock);
        assert_eq!(namer.generate("Makefile"), "Makefile_conflict_2024-05-01_12-00-00");
    }

    #[test]
    fn splits_on_last_dot_only() {
        let clock = clock_at(2024, 5, 1, 12, 0, 0);
        let namer = ConflictNamer::new(&clock);
        assert_eq!(namer.generate("archive.tar.gz"), "archive.tar_conflict_2024-05-01_12-00-00.gz");
    }

    #[test]
    fn same_clock_produces_same_name() {
        let clock = clock_at(2024, 5, 1, 12, 0, 0);
        let namer = ConflictNamer::new(&clock);
        assert_eq!(namer.generate("a.txt"), namer.generate("a.txt"));
    }
}
