//! Reason codes for audit log entries
//!
//! Structured codes categorizing why a sync-engine or capacity-engine
//! operation triggered, or why it failed, enriching the free-text `details`
//! object every [`crate::AuditEntry`] already carries.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Structured reason codes for sync/capacity triggers and failures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    /// A provider configured for this file had no active replica (I1).
    ReplicaMissing,
    /// Two replicas share a path but disagree on `calculated_id` (I2).
    CalculatedIdConflict,
    /// A replica lives under the soft-deleted path prefix (I3).
    SoftDeletePathMatch,
    /// The authoritative Google replica is gone while the file is
    /// soft-deleted (I4).
    GoogleReplicaGone,
    /// The provider's rate limiter rejected or delayed the call.
    ThrottlingExceeded,
    /// A network or server-side transient failure.
    TransientFailure,
    /// Insufficient permissions to perform the operation.
    PermissionDenied,
    /// The provider requires the account holder's out-of-band consent.
    ConsentRequired,
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReasonCode::ReplicaMissing => "replica_missing",
            ReasonCode::CalculatedIdConflict => "calculated_id_conflict",
            ReasonCode::SoftDeletePathMatch => "soft_delete_path_match",
            ReasonCode::GoogleReplicaGone => "google_replica_gone",
            ReasonCode::ThrottlingExceeded => "throttling_exceeded",
            ReasonCode::TransientFailure => "transient_failure",
            ReasonCode::PermissionDenied => "permission_denied",
            ReasonCode::ConsentRequired => "consent_required",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_code_display() {
        assert_eq!(ReasonCode::ReplicaMissing.to_string(), "replica_missing");
        assert_eq!(ReasonCode::GoogleReplicaGone.to_string(), "google_replica_gone");
    }

    #[test]
    fn reason_code_serialization() {
        let code = ReasonCode::ThrottlingExceeded;
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, "\"throttling_exceeded\"");
        let deserialized: ReasonCode = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, code);
    }
}
