//! Telegram message fragments backing one oversized [`crate::domain::Replica`]

use serde::{Deserialize, Serialize};

use super::newtypes::{FragmentId, NativeId, ReplicaId};

/// One Telegram message holding a slice of an oversized file's bytes
///
/// Telegram replicas split files larger than the single-message ceiling
/// (2 GiB minus a safety margin, §4.1) across several messages in the
/// backing channel. `sequence` orders fragments for reassembly; `byte_len`
/// records the slice size so readers can validate total size without
/// re-fetching every fragment's metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaFragment {
    id: FragmentId,
    replica_id: ReplicaId,
    sequence: u32,
    native_id: NativeId,
    byte_len: u64,
}

impl ReplicaFragment {
    #[must_use]
    pub fn new(replica_id: ReplicaId, sequence: u32, native_id: NativeId, byte_len: u64) -> Self {
        Self {
            id: FragmentId::new(0),
            replica_id,
            sequence,
            native_id,
            byte_len,
        }
    }

    #[must_use]
    pub fn from_parts(
        id: FragmentId,
        replica_id: ReplicaId,
        sequence: u32,
        native_id: NativeId,
        byte_len: u64,
    ) -> Self {
        Self {
            id,
            replica_id,
            sequence,
            native_id,
            byte_len,
        }
    }

    pub fn assign_id(&mut self, id: FragmentId) {
        self.id = id;
    }

    #[must_use]
    pub fn id(&self) -> FragmentId {
        self.id
    }

    #[must_use]
    pub fn replica_id(&self) -> ReplicaId {
        self.replica_id
    }

    #[must_use]
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    #[must_use]
    pub fn native_id(&self) -> &NativeId {
        &self.native_id
    }

    #[must_use]
    pub fn byte_len(&self) -> u64 {
        self.byte_len
    }
}

/// Sorts fragments by sequence and validates there are no gaps or
/// duplicates before reassembly.
pub fn order_for_reassembly(
    mut fragments: Vec<ReplicaFragment>,
) -> Result<Vec<ReplicaFragment>, String> {
    fragments.sort_by_key(ReplicaFragment::sequence);
    for (expected, fragment) in fragments.iter().enumerate() {
        if fragment.sequence() as usize != expected {
            return Err(format!(
                "fragment sequence gap: expected {expected}, found {}",
                fragment.sequence()
            ));
        }
    }
    Ok(fragments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(seq: u32) -> ReplicaFragment {
        ReplicaFragment::new(
            ReplicaId::new(1),
            seq,
            NativeId::new(format!("msg-{seq}")).unwrap(),
            1024,
        )
    }

    #[test]
    fn orders_out_of_sequence_fragments() {
        let fragments = vec![fragment(2), fragment(0), fragment(1)];
        let ordered = order_for_reassembly(fragments).unwrap();
        assert_eq!(
            ordered.iter().map(ReplicaFragment::sequence).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn rejects_gap_in_sequence() {
        let fragments = vec![fragment(0), fragment(2)];
        assert!(order_for_reassembly(fragments).is_err());
    }
}
