//! Metadata row store.
//!
//! The core treats the metadata store as a row store with CRUD-by-id plus two
//! query operations: resolving the documents linked to a case and atomically
//! clearing a version's content location. [`FsMetadataStore`] is the bundled
//! implementation, persisting each document as a JSON row in a sharded
//! directory tree:
//!
//! ```text
//! <root>/
//!   <s1>/
//!     <s2>/
//!       <document-id>/
//!         document.json   # the row
//!         audit.jsonl     # append-only audit trail
//! ```
//!
//! where `s1`/`s2` are the first four hex characters of the document id.
//!
//! ## Row shape and the checksum/URI pair
//!
//! The persisted version row keeps `content_uri` and `content_checksum` as
//! two nullable columns, mirroring the relational shape. Decoding validates
//! the pair: both set or both null. A half-set pair is an inconsistency that
//! must never occur, so decoding fails loudly with
//! [`DocumentError::InconsistentState`] instead of repairing it.
//!
//! ## Concurrency
//!
//! Mutations are serialized per document through an internal lock map, so
//! concurrent re-uploads of the same document produce a strictly ordered
//! version sequence with no lost append. Cross-document operations do not
//! contend. No lock is held across blob store calls; callers stage blob I/O
//! outside [`MetadataStore::update`].

use crate::audit::AuditEntry;
use crate::document::{ContentLocation, ContentVersion, StoredDocument};
use crate::error::{DocumentError, DocumentResult};
use chrono::{DateTime, Utc};
use docstore_types::{CaseRef, NonEmptyText};
use docstore_uuid::{CanonicalUuid, Sha256Hash};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Filename of the document row inside its sharded directory.
pub const DOCUMENT_ROW_FILE: &str = "document.json";

/// Filename of the append-only audit trail next to the row.
pub const AUDIT_LOG_FILE: &str = "audit.jsonl";

/// Row store for documents and their audit trail.
pub trait MetadataStore: Send + Sync {
    /// Persists a new document row.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::InvalidInput`] if a row already exists under
    /// the document's id.
    fn insert(&self, document: &StoredDocument) -> DocumentResult<()>;

    /// Loads a document row by id, `None` when absent.
    fn find(&self, id: &CanonicalUuid) -> DocumentResult<Option<StoredDocument>>;

    /// Read-modify-write of one document row, serialized per document.
    ///
    /// The closure sees the current row state and mutates it in place; the
    /// mutated row is persisted as a whole before the lock is released, so a
    /// paired field update (URI + checksum) is visible either completely or
    /// not at all.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::NotFound`] when no row exists, or whatever
    /// error the closure produces (in which case nothing is persisted).
    fn update(
        &self,
        id: &CanonicalUuid,
        mutate: &mut dyn FnMut(&mut StoredDocument) -> DocumentResult<()>,
    ) -> DocumentResult<StoredDocument>;

    /// Ids of all documents linked to `case_ref`.
    fn find_ids_by_case_ref(&self, case_ref: &CaseRef) -> DocumentResult<Vec<CanonicalUuid>>;

    /// Appends an entry to the owning document's audit trail.
    fn append_audit(&self, entry: &AuditEntry) -> DocumentResult<()>;

    /// Atomically clears the URI/checksum pair on one version row.
    ///
    /// The pair is cleared as a single row mutation: whole pair or nothing.
    fn clear_content_location(
        &self,
        document_id: &CanonicalUuid,
        version_id: &CanonicalUuid,
    ) -> DocumentResult<()> {
        self.update(document_id, &mut |doc| {
            let version = doc
                .versions
                .iter_mut()
                .find(|v| &v.id == version_id)
                .ok_or_else(|| {
                    DocumentError::NotFound(format!(
                        "version {version_id} of document {document_id}"
                    ))
                })?;
            version.location = None;
            Ok(())
        })
        .map(|_| ())
    }
}

/// Persisted shape of a content version: two nullable content columns.
#[derive(Debug, Serialize, Deserialize)]
struct ContentVersionRow {
    id: CanonicalUuid,
    document_id: CanonicalUuid,
    size_bytes: u64,
    mime_type: Option<NonEmptyText>,
    original_filename: NonEmptyText,
    content_uri: Option<NonEmptyText>,
    content_checksum: Option<Sha256Hash>,
    created_at: DateTime<Utc>,
}

impl From<&ContentVersion> for ContentVersionRow {
    fn from(version: &ContentVersion) -> Self {
        let (content_uri, content_checksum) = match &version.location {
            Some(location) => (Some(location.uri.clone()), Some(location.checksum.clone())),
            None => (None, None),
        };
        Self {
            id: version.id.clone(),
            document_id: version.document_id.clone(),
            size_bytes: version.size_bytes,
            mime_type: version.mime_type.clone(),
            original_filename: version.original_filename.clone(),
            content_uri,
            content_checksum,
            created_at: version.created_at,
        }
    }
}

impl ContentVersionRow {
    /// Decodes the row, validating the checksum/URI pair.
    fn into_domain(self) -> DocumentResult<ContentVersion> {
        let location = match (self.content_uri, self.content_checksum) {
            (Some(uri), Some(checksum)) => Some(ContentLocation { uri, checksum }),
            (None, None) => None,
            (uri, checksum) => {
                return Err(DocumentError::InconsistentState(format!(
                    "version {}: content URI and checksum must be set together \
                     (uri set: {}, checksum set: {})",
                    self.id,
                    uri.is_some(),
                    checksum.is_some()
                )))
            }
        };
        Ok(ContentVersion {
            id: self.id,
            document_id: self.document_id,
            size_bytes: self.size_bytes,
            mime_type: self.mime_type,
            original_filename: self.original_filename,
            location,
            created_at: self.created_at,
        })
    }
}

/// Persisted shape of a document.
#[derive(Debug, Serialize, Deserialize)]
struct DocumentRow {
    id: CanonicalUuid,
    created_by: NonEmptyText,
    classification: crate::document::Classification,
    roles: BTreeSet<String>,
    case_ref: Option<CaseRef>,
    versions: Vec<ContentVersionRow>,
    deleted: bool,
    hard_deleted: bool,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<&StoredDocument> for DocumentRow {
    fn from(document: &StoredDocument) -> Self {
        Self {
            id: document.id.clone(),
            created_by: document.created_by.clone(),
            classification: document.classification,
            roles: document.roles.clone(),
            case_ref: document.case_ref.clone(),
            versions: document.versions.iter().map(Into::into).collect(),
            deleted: document.deleted,
            hard_deleted: document.hard_deleted,
            deleted_at: document.deleted_at,
            created_at: document.created_at,
        }
    }
}

impl DocumentRow {
    fn into_domain(self) -> DocumentResult<StoredDocument> {
        let versions = self
            .versions
            .into_iter()
            .map(ContentVersionRow::into_domain)
            .collect::<DocumentResult<Vec<_>>>()?;
        Ok(StoredDocument {
            id: self.id,
            created_by: self.created_by,
            classification: self.classification,
            roles: self.roles,
            case_ref: self.case_ref,
            versions,
            deleted: self.deleted,
            hard_deleted: self.hard_deleted,
            deleted_at: self.deleted_at,
            created_at: self.created_at,
        })
    }
}

/// Filesystem row store with per-document serialization.
#[derive(Debug)]
pub struct FsMetadataStore {
    root: PathBuf,
    row_locks: Mutex<HashMap<CanonicalUuid, Arc<Mutex<()>>>>,
}

impl FsMetadataStore {
    /// Creates a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::InvalidInput`] if `root` is not an existing
    /// directory.
    pub fn new(root: &Path) -> DocumentResult<Self> {
        if !root.is_dir() {
            return Err(DocumentError::InvalidInput(format!(
                "metadata root is not an existing directory: {}",
                root.display()
            )));
        }
        let root = root.canonicalize().map_err(DocumentError::RowRead)?;
        Ok(Self {
            root,
            row_locks: Mutex::new(HashMap::new()),
        })
    }

    fn document_dir(&self, id: &CanonicalUuid) -> PathBuf {
        id.sharded_dir(&self.root)
    }

    fn row_path(&self, id: &CanonicalUuid) -> PathBuf {
        self.document_dir(id).join(DOCUMENT_ROW_FILE)
    }

    fn audit_path(&self, id: &CanonicalUuid) -> PathBuf {
        self.document_dir(id).join(AUDIT_LOG_FILE)
    }

    /// Returns the lock serializing mutations of one document.
    fn row_lock(&self, id: &CanonicalUuid) -> Arc<Mutex<()>> {
        let mut map = self
            .row_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        map.entry(id.clone()).or_default().clone()
    }

    fn read_row(&self, id: &CanonicalUuid) -> DocumentResult<Option<DocumentRow>> {
        match fs::read(self.row_path(id)) {
            Ok(bytes) => {
                let row = serde_json::from_slice(&bytes)
                    .map_err(DocumentError::RowDeserialization)?;
                Ok(Some(row))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DocumentError::RowRead(e)),
        }
    }

    fn write_row(&self, row: &DocumentRow) -> DocumentResult<()> {
        let dir = self.document_dir(&row.id);
        fs::create_dir_all(&dir).map_err(DocumentError::RowWrite)?;
        let bytes = serde_json::to_vec_pretty(row).map_err(DocumentError::RowSerialization)?;
        fs::write(dir.join(DOCUMENT_ROW_FILE), bytes).map_err(DocumentError::RowWrite)
    }
}

impl MetadataStore for FsMetadataStore {
    fn insert(&self, document: &StoredDocument) -> DocumentResult<()> {
        let lock = self.row_lock(&document.id);
        let _guard: MutexGuard<'_, ()> = lock.lock().unwrap_or_else(|p| p.into_inner());

        if self.row_path(&document.id).exists() {
            return Err(DocumentError::InvalidInput(format!(
                "document {} already exists",
                document.id
            )));
        }
        self.write_row(&DocumentRow::from(document))
    }

    fn find(&self, id: &CanonicalUuid) -> DocumentResult<Option<StoredDocument>> {
        match self.read_row(id)? {
            Some(row) => Ok(Some(row.into_domain()?)),
            None => Ok(None),
        }
    }

    fn update(
        &self,
        id: &CanonicalUuid,
        mutate: &mut dyn FnMut(&mut StoredDocument) -> DocumentResult<()>,
    ) -> DocumentResult<StoredDocument> {
        let lock = self.row_lock(id);
        let _guard: MutexGuard<'_, ()> = lock.lock().unwrap_or_else(|p| p.into_inner());

        let row = self
            .read_row(id)?
            .ok_or_else(|| DocumentError::NotFound(format!("document {id}")))?;
        let mut document = row.into_domain()?;
        mutate(&mut document)?;
        self.write_row(&DocumentRow::from(&document))?;
        Ok(document)
    }

    fn find_ids_by_case_ref(&self, case_ref: &CaseRef) -> DocumentResult<Vec<CanonicalUuid>> {
        let mut ids = Vec::new();

        let s1_iter = match fs::read_dir(&self.root) {
            Ok(it) => it,
            Err(e) => return Err(DocumentError::RowRead(e)),
        };
        for s1 in s1_iter.flatten() {
            if !s1.path().is_dir() {
                continue;
            }
            let s2_iter = match fs::read_dir(s1.path()) {
                Ok(it) => it,
                Err(_) => continue,
            };
            for s2 in s2_iter.flatten() {
                if !s2.path().is_dir() {
                    continue;
                }
                let id_iter = match fs::read_dir(s2.path()) {
                    Ok(it) => it,
                    Err(_) => continue,
                };
                for id_entry in id_iter.flatten() {
                    let row_path = id_entry.path().join(DOCUMENT_ROW_FILE);
                    if !row_path.is_file() {
                        continue;
                    }
                    let Ok(bytes) = fs::read(&row_path) else {
                        continue;
                    };
                    match serde_json::from_slice::<DocumentRow>(&bytes) {
                        Ok(row) => {
                            if row.case_ref.as_ref() == Some(case_ref) {
                                ids.push(row.id);
                            }
                        }
                        Err(e) => {
                            tracing::warn!(
                                path = %row_path.display(),
                                error = %e,
                                "skipping unparseable document row during case scan"
                            );
                        }
                    }
                }
            }
        }

        ids.sort();
        Ok(ids)
    }

    fn append_audit(&self, entry: &AuditEntry) -> DocumentResult<()> {
        let dir = self.document_dir(&entry.document_id);
        fs::create_dir_all(&dir).map_err(DocumentError::RowWrite)?;

        let mut line = serde_json::to_vec(entry).map_err(DocumentError::RowSerialization)?;
        line.push(b'\n');

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.audit_path(&entry.document_id))
            .map_err(DocumentError::RowWrite)?;
        file.write_all(&line).map_err(DocumentError::RowWrite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditAction, SYSTEM_ACTOR};
    use crate::document::Classification;
    use tempfile::TempDir;

    fn store(temp: &TempDir) -> FsMetadataStore {
        FsMetadataStore::new(temp.path()).unwrap()
    }

    fn sample_document(case_ref: Option<&str>) -> StoredDocument {
        let id = CanonicalUuid::new();
        let version_id = CanonicalUuid::new();
        StoredDocument {
            id: id.clone(),
            created_by: NonEmptyText::new("user-a").unwrap(),
            classification: Classification::Public,
            roles: ["citizen".to_string()].into_iter().collect(),
            case_ref: case_ref.map(|r| CaseRef::new(r).unwrap()),
            versions: vec![ContentVersion {
                id: version_id.clone(),
                document_id: id,
                size_bytes: 12,
                mime_type: Some(NonEmptyText::new("text/plain").unwrap()),
                original_filename: NonEmptyText::new("note.txt").unwrap(),
                location: Some(ContentLocation {
                    uri: NonEmptyText::new(format!("blob://{version_id}")).unwrap(),
                    checksum: Sha256Hash::from_bytes(&[0x42; 32]),
                }),
                created_at: Utc::now(),
            }],
            deleted: false,
            hard_deleted: false,
            deleted_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn insert_and_find_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let document = sample_document(None);

        store.insert(&document).unwrap();
        let loaded = store.find(&document.id).unwrap().unwrap();
        assert_eq!(loaded, document);
    }

    #[test]
    fn insert_rejects_duplicate_id() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let document = sample_document(None);

        store.insert(&document).unwrap();
        assert!(matches!(
            store.insert(&document),
            Err(DocumentError::InvalidInput(_))
        ));
    }

    #[test]
    fn find_absent_is_none() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        assert!(store.find(&CanonicalUuid::new()).unwrap().is_none());
    }

    #[test]
    fn update_persists_mutation() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let document = sample_document(None);
        store.insert(&document).unwrap();

        let updated = store
            .update(&document.id, &mut |doc| {
                doc.deleted = true;
                doc.deleted_at = Some(Utc::now());
                Ok(())
            })
            .unwrap();
        assert!(updated.deleted);

        let reloaded = store.find(&document.id).unwrap().unwrap();
        assert!(reloaded.deleted);
        assert!(reloaded.deleted_at.is_some());
    }

    #[test]
    fn update_absent_is_not_found() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let result = store.update(&CanonicalUuid::new(), &mut |_| Ok(()));
        assert!(matches!(result, Err(DocumentError::NotFound(_))));
    }

    #[test]
    fn failed_mutation_persists_nothing() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let document = sample_document(None);
        store.insert(&document).unwrap();

        let result = store.update(&document.id, &mut |doc| {
            doc.deleted = true;
            Err(DocumentError::InvalidInput("refused".into()))
        });
        assert!(result.is_err());

        let reloaded = store.find(&document.id).unwrap().unwrap();
        assert!(!reloaded.deleted);
    }

    #[test]
    fn clear_content_location_clears_the_pair() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let document = sample_document(None);
        let version_id = document.versions[0].id.clone();
        store.insert(&document).unwrap();

        store
            .clear_content_location(&document.id, &version_id)
            .unwrap();

        let reloaded = store.find(&document.id).unwrap().unwrap();
        assert!(reloaded.versions[0].location.is_none());

        // The raw row must have both columns null, not just one.
        let raw = fs::read_to_string(store.row_path(&document.id)).unwrap();
        let row: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(row["versions"][0]["content_uri"].is_null());
        assert!(row["versions"][0]["content_checksum"].is_null());
    }

    #[test]
    fn clear_content_location_unknown_version_is_not_found() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let document = sample_document(None);
        store.insert(&document).unwrap();

        let result = store.clear_content_location(&document.id, &CanonicalUuid::new());
        assert!(matches!(result, Err(DocumentError::NotFound(_))));
    }

    #[test]
    fn half_set_content_pair_fails_loudly() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let document = sample_document(None);
        store.insert(&document).unwrap();

        // Corrupt the row: URI present, checksum null.
        let path = store.row_path(&document.id);
        let raw = fs::read_to_string(&path).unwrap();
        let mut row: serde_json::Value = serde_json::from_str(&raw).unwrap();
        row["versions"][0]["content_checksum"] = serde_json::Value::Null;
        fs::write(&path, serde_json::to_vec(&row).unwrap()).unwrap();

        let result = store.find(&document.id);
        assert!(matches!(result, Err(DocumentError::InconsistentState(_))));
    }

    #[test]
    fn find_ids_by_case_ref_filters_and_sorts() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let case = CaseRef::new("CASE-1").unwrap();

        let linked_a = sample_document(Some("CASE-1"));
        let linked_b = sample_document(Some("CASE-1"));
        let other_case = sample_document(Some("CASE-2"));
        let unlinked = sample_document(None);
        for doc in [&linked_a, &linked_b, &other_case, &unlinked] {
            store.insert(doc).unwrap();
        }

        let mut expected = vec![linked_a.id.clone(), linked_b.id.clone()];
        expected.sort();
        assert_eq!(store.find_ids_by_case_ref(&case).unwrap(), expected);
    }

    #[test]
    fn append_audit_writes_one_line_per_entry() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let document = sample_document(None);
        store.insert(&document).unwrap();

        let first = AuditEntry::now(document.id.clone(), AuditAction::Created, "user-a");
        let second = AuditEntry::now(document.id.clone(), AuditAction::SoftDeleted, SYSTEM_ACTOR);
        store.append_audit(&first).unwrap();
        store.append_audit(&second).unwrap();

        let raw = fs::read_to_string(store.audit_path(&document.id)).unwrap();
        let entries: Vec<AuditEntry> = raw
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(entries, vec![first, second]);
    }
}
