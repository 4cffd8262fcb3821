//! Audit trail records.
//!
//! Every externally visible operation on a document appends an entry to the
//! document's audit log. Entries are append-only and survive soft deletion;
//! retention of the full trail is the reason metadata rows are never removed.

use chrono::{DateTime, Utc};
use docstore_uuid::CanonicalUuid;
use serde::{Deserialize, Serialize};

/// Actor recorded for operations the system runs on its own behalf, such as
/// the case bulk-deletion workflow.
pub const SYSTEM_ACTOR: &str = "system";

/// The operation an audit entry records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    MetadataRead,
    ContentRead,
    SoftDeleted,
    HardDeleted,
    ContentDeleted,
}

/// One entry in a document's audit trail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub document_id: CanonicalUuid,
    /// Set when the action targeted one content version.
    pub version_id: Option<CanonicalUuid>,
    pub action: AuditAction,
    /// Subject id of the caller, or [`SYSTEM_ACTOR`].
    pub actor: String,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Builds an entry for a document-level action, stamped now.
    pub fn now(document_id: CanonicalUuid, action: AuditAction, actor: &str) -> Self {
        Self {
            document_id,
            version_id: None,
            action,
            actor: actor.to_owned(),
            recorded_at: Utc::now(),
        }
    }

    /// Builds an entry for an action on one content version, stamped now.
    pub fn now_for_version(
        document_id: CanonicalUuid,
        version_id: CanonicalUuid,
        action: AuditAction,
        actor: &str,
    ) -> Self {
        Self {
            document_id,
            version_id: Some(version_id),
            action,
            actor: actor.to_owned(),
            recorded_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_serialises_snake_case() {
        let json = serde_json::to_string(&AuditAction::SoftDeleted).unwrap();
        assert_eq!(json, "\"soft_deleted\"");
    }

    #[test]
    fn entry_round_trips_through_json() {
        let entry = AuditEntry::now_for_version(
            CanonicalUuid::new(),
            CanonicalUuid::new(),
            AuditAction::ContentDeleted,
            SYSTEM_ACTOR,
        );
        let json = serde_json::to_string(&entry).unwrap();
        let back: AuditEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
