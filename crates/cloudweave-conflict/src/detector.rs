//! Cross-provider conflict detection (I2)
//!
//! A conflict exists when two replicas share a [`SyncPath`] but carry
//! different `calculated_id`s: same name and size-in-path collide, but the
//! bytes behind them differ. The replica on the highest-priority provider
//! (G ≻ M ≻ T) is the master and keeps its path untouched; every other
//! differing replica at that path becomes one [`ConflictPair`] for the
//! resolver to copy onto the master's provider under a renamed copy.

use std::collections::HashMap;

use cloudweave_core::domain::{CalculatedId, Replica, SyncPath};

/// One conflicting pair produced by [`ConflictDetector::find`].
#[derive(Debug, Clone)]
pub struct ConflictPair {
    pub master: Replica,
    pub other: Replica,
}

pub struct ConflictDetector;

impl ConflictDetector {
    /// Scans every active replica across every account and returns one
    /// [`ConflictPair`] per distinct content fingerprint competing for the
    /// same path.
    #[must_use]
    pub fn find(replicas: &[Replica]) -> Vec<ConflictPair> {
        let mut by_path: HashMap<&SyncPath, Vec<&Replica>> = HashMap::new();
        for replica in replicas {
            by_path.entry(replica.path()).or_default().push(replica);
        }

        by_path.values().flat_map(|group| Self::pairs_within(group)).collect()
    }

    fn pairs_within(group: &[&Replica]) -> Vec<ConflictPair> {
        // One representative replica per distinct content fingerprint at this path.
        let mut by_fingerprint: HashMap<&CalculatedId, &Replica> = HashMap::new();
        for replica in group {
            by_fingerprint.entry(replica.calculated_id()).or_insert(replica);
        }

        if by_fingerprint.len() < 2 {
            return Vec::new();
        }

        let master = *by_fingerprint
            .values()
            .min_by_key(|r| r.provider().priority())
            .expect("checked len >= 2 above");

        by_fingerprint
            .values()
            .filter(|r| r.calculated_id() != master.calculated_id())
            .map(|r| ConflictPair {
                master: (*master).clone(),
                other: (**r).clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cloudweave_core::domain::{AccountId, LogicalFileId, NativeId, Provider};

    fn replica(provider: Provider, path: &str, size: u64) -> Replica {
        Replica::new(
            LogicalFileId::new(),
            AccountId::new(format!("{provider}-acct")).unwrap(),
            provider,
            NativeId::new("native").unwrap(),
            None,
            SyncPath::new(path).unwrap(),
            size,
            Utc::now(),
        )
    }

    #[test]
    fn no_pairs_when_all_replicas_agree() {
        let replicas = vec![
            replica(Provider::Google, "r/x.bin", 10),
            replica(Provider::Microsoft, "r/x.bin", 10),
        ];
        assert!(ConflictDetector::find(&replicas).is_empty());
    }

    #[test]
    fn differing_calculated_id_produces_one_pair_with_google_as_master() {
        let replicas = vec![
            replica(Provider::Google, "r/x.bin", 10),
            replica(Provider::Microsoft, "r/x.bin", 11),
        ];
        let pairs = ConflictDetector::find(&replicas);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].master.provider(), Provider::Google);
        assert_eq!(pairs[0].other.provider(), Provider::Microsoft);
    }

    #[test]
    fn three_way_disagreement_produces_two_pairs_against_the_master() {
        let replicas = vec![
            replica(Provider::Google, "r/x.bin", 10),
            replica(Provider::Microsoft, "r/x.bin", 11),
            replica(Provider::Telegram, "r/x.bin", 12),
        ];
        let pairs = ConflictDetector::find(&replicas);
        assert_eq!(pairs.len(), 2);
        assert!(pairs.iter().all(|p| p.master.provider() == Provider::Google));
    }

    #[test]
    fn different_paths_never_pair() {
        let replicas = vec![
            replica(Provider::Google, "r/a.bin", 10),
            replica(Provider::Microsoft, "r/b.bin", 99),
        ];
        assert!(ConflictDetector::find(&replicas).is_empty());
    }

    #[test]
    fn master_original_is_not_mutated_by_detection() {
        let replicas = vec![
            replica(Provider::Google, "r/x.bin", 10),
            replica(Provider::Microsoft, "r/x.bin", 11),
        ];
        let pairs = ConflictDetector::find(&replicas);
        assert_eq!(pairs[0].master.path(), replicas[0].path());
        assert_eq!(pairs[0].master.calculated_id(), replicas[0].calculated_id());
    }
}
