//! Domain entities: stored documents and their content versions.
//!
//! A [`StoredDocument`] owns an ordered list of [`ContentVersion`]s;
//! insertion order is the version history, newest last. Metadata deletion is
//! a soft delete (flag plus timestamp, rows retained for audit); binary
//! deletion clears a version's [`ContentLocation`] while the row stays.
//!
//! The checksum and content URI always travel together: a version either has
//! a complete `ContentLocation` or none at all. Holding them as one optional
//! struct makes the half-set state unrepresentable in memory; the persisted
//! row keeps two nullable columns and the metadata store rejects a half-set
//! pair on decode.

use crate::security::AccessControlled;
use chrono::{DateTime, Utc};
use docstore_types::{CaseRef, NonEmptyText};
use docstore_uuid::{CanonicalUuid, Sha256Hash};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Security classification of a stored document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Classification {
    Public,
    Private,
    Restricted,
}

impl Classification {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "PUBLIC",
            Self::Private => "PRIVATE",
            Self::Restricted => "RESTRICTED",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Classification {
    type Err = crate::error::DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PUBLIC" => Ok(Self::Public),
            "PRIVATE" => Ok(Self::Private),
            "RESTRICTED" => Ok(Self::Restricted),
            other => Err(crate::error::DocumentError::InvalidInput(format!(
                "unknown classification: '{other}'"
            ))),
        }
    }
}

/// Where a version's binary content lives, plus its integrity checksum.
///
/// The pair is atomic: it is set as a whole when content is stored and
/// cleared as a whole when content is deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentLocation {
    /// `blob://<key>` reference into the content store.
    pub uri: NonEmptyText,
    /// SHA-256 digest of the stored bytes.
    pub checksum: Sha256Hash,
}

/// One immutable binary payload in a document's version history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ContentVersion {
    pub id: CanonicalUuid,
    /// Owning document (back-reference, not ownership).
    pub document_id: CanonicalUuid,
    pub size_bytes: u64,
    /// Media type as supplied by the uploader, or sniffed from the bytes.
    /// Best-effort either way, never authoritative.
    pub mime_type: Option<NonEmptyText>,
    pub original_filename: NonEmptyText,
    /// `None` once the binary has been deleted while metadata is retained.
    pub location: Option<ContentLocation>,
    pub created_at: DateTime<Utc>,
}

impl ContentVersion {
    /// True while the binary payload is still present in the content store.
    pub fn has_content(&self) -> bool {
        self.location.is_some()
    }
}

/// A stored document: classification, access roles and version history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StoredDocument {
    pub id: CanonicalUuid,
    pub created_by: NonEmptyText,
    pub classification: Classification,
    /// Roles authorised to act on this document besides the creator.
    pub roles: BTreeSet<String>,
    /// Case this document is linked to, if any.
    pub case_ref: Option<CaseRef>,
    /// Version history, insertion order, newest last.
    pub versions: Vec<ContentVersion>,
    pub deleted: bool,
    pub hard_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl StoredDocument {
    /// The current version: the newest one whose binary is still present.
    pub fn current_version(&self) -> Option<&ContentVersion> {
        self.versions.iter().rev().find(|v| v.has_content())
    }

    /// Looks up a version of this document by id.
    pub fn version(&self, version_id: &CanonicalUuid) -> Option<&ContentVersion> {
        self.versions.iter().find(|v| &v.id == version_id)
    }
}

impl AccessControlled for StoredDocument {
    fn creator_id(&self) -> &str {
        self.created_by.as_str()
    }

    fn authorized_roles(&self) -> &BTreeSet<String> {
        &self.roles
    }
}

/// One uploaded file, as handed over by the (external) multipart layer.
#[derive(Clone, Debug)]
pub struct UploadedContent {
    pub bytes: Vec<u8>,
    /// Declared media type; when absent the content service sniffs one.
    pub mime_type: Option<NonEmptyText>,
    pub original_filename: NonEmptyText,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(document_id: &CanonicalUuid, with_content: bool) -> ContentVersion {
        let id = CanonicalUuid::new();
        ContentVersion {
            id: id.clone(),
            document_id: document_id.clone(),
            size_bytes: 3,
            mime_type: None,
            original_filename: NonEmptyText::new("file.bin").unwrap(),
            location: with_content.then(|| ContentLocation {
                uri: NonEmptyText::new(format!("blob://{id}")).unwrap(),
                checksum: Sha256Hash::from_bytes(&[0x11; 32]),
            }),
            created_at: Utc::now(),
        }
    }

    fn document(versions: Vec<ContentVersion>) -> StoredDocument {
        StoredDocument {
            id: CanonicalUuid::new(),
            created_by: NonEmptyText::new("user-a").unwrap(),
            classification: Classification::Public,
            roles: BTreeSet::new(),
            case_ref: None,
            versions,
            deleted: false,
            hard_deleted: false,
            deleted_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn classification_serialises_uppercase() {
        let json = serde_json::to_string(&Classification::Restricted).unwrap();
        assert_eq!(json, "\"RESTRICTED\"");
    }

    #[test]
    fn classification_parses_case_insensitively() {
        assert_eq!(
            "private".parse::<Classification>().unwrap(),
            Classification::Private
        );
        assert!("secret".parse::<Classification>().is_err());
    }

    #[test]
    fn current_version_is_newest_with_content() {
        let doc_id = CanonicalUuid::new();
        let v1 = version(&doc_id, true);
        let v2 = version(&doc_id, true);
        let doc = document(vec![v1, v2.clone()]);
        assert_eq!(doc.current_version().unwrap().id, v2.id);
    }

    #[test]
    fn current_version_skips_cleared_versions() {
        let doc_id = CanonicalUuid::new();
        let v1 = version(&doc_id, true);
        let v2 = version(&doc_id, false);
        let doc = document(vec![v1.clone(), v2]);
        assert_eq!(doc.current_version().unwrap().id, v1.id);
    }

    #[test]
    fn current_version_is_none_when_all_cleared() {
        let doc_id = CanonicalUuid::new();
        let doc = document(vec![version(&doc_id, false)]);
        assert!(doc.current_version().is_none());
    }

    #[test]
    fn document_exposes_access_control_data() {
        let mut doc = document(vec![]);
        doc.roles.insert("citizen".to_string());
        assert_eq!(doc.creator_id(), "user-a");
        assert!(doc.authorized_roles().contains("citizen"));
    }
}
