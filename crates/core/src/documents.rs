//! Stored document operations.
//!
//! [`StoredDocumentService`] is the aggregate manager: every externally
//! triggered read or write of a document goes through here. Before anything
//! else it resolves the document and consults the permission evaluator;
//! binary work is delegated to the content version service, and every
//! successful operation is recorded in the document's audit trail.
//!
//! ## Not-found before forbidden
//!
//! Absence is checked before any permission evaluation: a missing identifier
//! surfaces as `NotFound`, never as `Forbidden`. How those two outcomes are
//! collapsed for unauthenticated callers (a uniform "access denied" that
//! leaks no existence information) is response shaping owned by the external
//! HTTP layer; the core keeps them distinct so that layer can make the call.

use crate::audit::{AuditAction, AuditEntry};
use crate::caller::Caller;
use crate::content::ContentVersionService;
use crate::document::{Classification, ContentVersion, StoredDocument, UploadedContent};
use crate::error::{DocumentError, DocumentResult};
use crate::metadata::MetadataStore;
use crate::security::{AccessDecision, Permission, PermissionService};
use chrono::Utc;
use docstore_types::CaseRef;
use docstore_uuid::CanonicalUuid;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Upload request: files plus the access-control envelope they share.
#[derive(Clone, Debug)]
pub struct UploadDocumentsCommand {
    pub files: Vec<UploadedContent>,
    pub classification: Classification,
    /// Roles authorised to act on the created documents besides the creator.
    pub roles: BTreeSet<String>,
    /// Case to link the created documents to, if any.
    pub case_ref: Option<CaseRef>,
}

/// Aggregate manager for stored documents.
#[derive(Clone)]
pub struct StoredDocumentService {
    store: Arc<dyn MetadataStore>,
    content: ContentVersionService,
    permissions: PermissionService,
}

impl StoredDocumentService {
    pub fn new(
        store: Arc<dyn MetadataStore>,
        content: ContentVersionService,
        permissions: PermissionService,
    ) -> Self {
        Self {
            store,
            content,
            permissions,
        }
    }

    /// Creates one document (with its first content version) per uploaded
    /// file, returning them in input order.
    ///
    /// Each document and its first version become visible in one metadata
    /// insert; a failure while storing one file stops the batch and leaves no
    /// partial document behind for that file.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::InvalidInput`] for an empty upload and
    /// storage errors from the blob or metadata store.
    pub fn create_from(
        &self,
        command: &UploadDocumentsCommand,
        caller: &Caller,
    ) -> DocumentResult<Vec<StoredDocument>> {
        if command.files.is_empty() {
            return Err(DocumentError::InvalidInput(
                "at least one file is required".into(),
            ));
        }

        let mut documents = Vec::with_capacity(command.files.len());
        for file in &command.files {
            documents.push(self.create_one(file, command, caller)?);
        }
        Ok(documents)
    }

    fn create_one(
        &self,
        file: &UploadedContent,
        command: &UploadDocumentsCommand,
        caller: &Caller,
    ) -> DocumentResult<StoredDocument> {
        let document_id = CanonicalUuid::new();
        let version = self.content.stage_version(&document_id, file)?;
        let version_id = version.id.clone();

        let document = StoredDocument {
            id: document_id.clone(),
            created_by: caller.subject().clone(),
            classification: command.classification,
            roles: command.roles.clone(),
            case_ref: command.case_ref.clone(),
            versions: vec![version],
            deleted: false,
            hard_deleted: false,
            deleted_at: None,
            created_at: Utc::now(),
        };

        if let Err(e) = self.store.insert(&document) {
            self.content.discard_staged(&document.versions[0]);
            return Err(e);
        }

        self.store.append_audit(&AuditEntry::now_for_version(
            document_id,
            version_id,
            AuditAction::Created,
            caller.subject_id(),
        ))?;
        Ok(document)
    }

    /// Reads a document's metadata under `Permission::Read`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::NotFound`] for an absent or soft-deleted
    /// document and [`DocumentError::Forbidden`] when the policy denies.
    pub fn read(&self, id: &CanonicalUuid, caller: &Caller) -> DocumentResult<StoredDocument> {
        let document = self.load_live(id)?;
        self.authorize(&document, Permission::Read, caller)?;
        self.store.append_audit(&AuditEntry::now(
            id.clone(),
            AuditAction::MetadataRead,
            caller.subject_id(),
        ))?;
        Ok(document)
    }

    /// Reads the binary content of the document's most recent version under
    /// `Permission::Read`.
    ///
    /// # Errors
    ///
    /// As [`read`](Self::read), plus [`DocumentError::NotFound`] when no
    /// version has content left and [`DocumentError::StorageRead`] on
    /// backend failure.
    pub fn read_binary(
        &self,
        id: &CanonicalUuid,
        caller: &Caller,
    ) -> DocumentResult<(ContentVersion, Vec<u8>)> {
        let document = self.load_live(id)?;
        self.authorize(&document, Permission::Read, caller)?;

        let version = self.content.most_recent_version(&document)?;
        let bytes = self.content.read_binary(&version)?;

        self.store.append_audit(&AuditEntry::now_for_version(
            id.clone(),
            version.id.clone(),
            AuditAction::ContentRead,
            caller.subject_id(),
        ))?;
        Ok((version, bytes))
    }

    /// Deletes a document under `Permission::Delete`.
    ///
    /// The soft delete sets the flag and timestamp and retains every row for
    /// audit; it is idempotent. With `hard = true` the binaries of all
    /// versions are deleted through the content service as well, and the
    /// document is marked hard-deleted once every version is cleared.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::NotFound`] for an absent document,
    /// [`DocumentError::Forbidden`] on deny, and storage errors from the
    /// hard-delete path (rows stay consistent; a retry finishes the job).
    pub fn delete(&self, id: &CanonicalUuid, caller: &Caller, hard: bool) -> DocumentResult<()> {
        // A soft-deleted document can still be hard-deleted, so absence is
        // the only not-found condition here.
        let document = self
            .store
            .find(id)?
            .ok_or_else(|| DocumentError::NotFound(format!("document {id}")))?;
        self.authorize(&document, Permission::Delete, caller)?;

        let mut newly_deleted = false;
        let updated = self.store.update(id, &mut |doc| {
            if !doc.deleted {
                doc.deleted = true;
                doc.deleted_at = Some(Utc::now());
                newly_deleted = true;
            }
            Ok(())
        })?;
        if newly_deleted {
            self.store.append_audit(&AuditEntry::now(
                id.clone(),
                AuditAction::SoftDeleted,
                caller.subject_id(),
            ))?;
        }

        if hard {
            for version in &updated.versions {
                if version.has_content() {
                    self.content.delete_binary(version)?;
                    self.store.append_audit(&AuditEntry::now_for_version(
                        id.clone(),
                        version.id.clone(),
                        AuditAction::ContentDeleted,
                        caller.subject_id(),
                    ))?;
                }
            }
            self.store.update(id, &mut |doc| {
                doc.hard_deleted = true;
                Ok(())
            })?;
            self.store.append_audit(&AuditEntry::now(
                id.clone(),
                AuditAction::HardDeleted,
                caller.subject_id(),
            ))?;
        }

        Ok(())
    }

    /// Resolves a document that is present and not soft-deleted.
    fn load_live(&self, id: &CanonicalUuid) -> DocumentResult<StoredDocument> {
        let document = self
            .store
            .find(id)?
            .ok_or_else(|| DocumentError::NotFound(format!("document {id}")))?;
        if document.deleted {
            return Err(DocumentError::NotFound(format!("document {id}")));
        }
        Ok(document)
    }

    fn authorize(
        &self,
        document: &StoredDocument,
        permission: Permission,
        caller: &Caller,
    ) -> DocumentResult<()> {
        match self.permissions.decide(document, permission, caller) {
            AccessDecision::Allow => Ok(()),
            AccessDecision::Deny => Err(DocumentError::Forbidden),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{FsMetadataStore, AUDIT_LOG_FILE};
    use docstore_blob::FsBlobStore;
    use docstore_types::NonEmptyText;
    use tempfile::TempDir;

    struct Fixture {
        data: TempDir,
        _blobs: TempDir,
        store: Arc<FsMetadataStore>,
        service: StoredDocumentService,
    }

    fn fixture() -> Fixture {
        let data = TempDir::new().unwrap();
        let blobs = TempDir::new().unwrap();
        let store = Arc::new(FsMetadataStore::new(data.path()).unwrap());
        let blob = Arc::new(FsBlobStore::new(blobs.path()).unwrap());
        let content = ContentVersionService::new(blob, store.clone());
        let permissions =
            PermissionService::new(["caseworker".to_string()].into_iter().collect());
        let service = StoredDocumentService::new(store.clone(), content, permissions);
        Fixture {
            data,
            _blobs: blobs,
            store,
            service,
        }
    }

    fn caller(subject: &str, roles: &[&str]) -> Caller {
        Caller::new(subject, roles.iter().map(|r| r.to_string())).unwrap()
    }

    fn upload_command(files: &[&str], roles: &[&str]) -> UploadDocumentsCommand {
        UploadDocumentsCommand {
            files: files
                .iter()
                .enumerate()
                .map(|(i, content)| UploadedContent {
                    bytes: content.as_bytes().to_vec(),
                    mime_type: Some(NonEmptyText::new("text/plain").unwrap()),
                    original_filename: NonEmptyText::new(format!("file-{i}.txt")).unwrap(),
                })
                .collect(),
            classification: Classification::Public,
            roles: roles.iter().map(|r| r.to_string()).collect(),
            case_ref: None,
        }
    }

    fn audit_lines(fx: &Fixture, id: &CanonicalUuid) -> Vec<AuditEntry> {
        let root = fx.data.path().canonicalize().unwrap();
        let path = id.sharded_dir(&root).join(AUDIT_LOG_FILE);
        std::fs::read_to_string(path)
            .unwrap_or_default()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn create_from_returns_documents_in_input_order() {
        let fx = fixture();
        let creator = caller("user-a", &[]);

        let documents = fx
            .service
            .create_from(&upload_command(&["one", "two", "three"], &[]), &creator)
            .unwrap();

        assert_eq!(documents.len(), 3);
        for (i, doc) in documents.iter().enumerate() {
            assert_eq!(doc.created_by.as_str(), "user-a");
            assert_eq!(doc.versions.len(), 1);
            assert_eq!(
                doc.versions[0].original_filename.as_str(),
                format!("file-{i}.txt")
            );
            assert!(fx.store.find(&doc.id).unwrap().is_some());
        }
    }

    #[test]
    fn create_from_rejects_empty_upload() {
        let fx = fixture();
        let result = fx
            .service
            .create_from(&upload_command(&[], &[]), &caller("user-a", &[]));
        assert!(matches!(result, Err(DocumentError::InvalidInput(_))));
    }

    #[test]
    fn create_records_audit_entry() {
        let fx = fixture();
        let documents = fx
            .service
            .create_from(&upload_command(&["one"], &[]), &caller("user-a", &[]))
            .unwrap();

        let entries = audit_lines(&fx, &documents[0].id);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::Created);
        assert_eq!(entries[0].actor, "user-a");
        assert_eq!(entries[0].version_id, Some(documents[0].versions[0].id.clone()));
    }

    #[test]
    fn access_scenario_creator_role_and_stranger() {
        let fx = fixture();
        let creator = caller("user-a", &[]);
        let documents = fx
            .service
            .create_from(&upload_command(&["content"], &["citizen"]), &creator)
            .unwrap();
        let id = documents[0].id.clone();

        // B holds a matching role: allowed although not the creator.
        let b = caller("user-b", &["citizen"]);
        assert!(fx.service.read(&id, &b).is_ok());

        // C has no roles and is not the creator: denied.
        let c = caller("user-c", &[]);
        assert!(matches!(
            fx.service.read(&id, &c),
            Err(DocumentError::Forbidden)
        ));

        // A case worker bypasses both checks.
        let clerk = caller("user-d", &["caseworker"]);
        assert!(fx.service.read(&id, &clerk).is_ok());

        // The creator deletes: allowed, flag and timestamp set.
        fx.service.delete(&id, &creator, false).unwrap();
        let deleted = fx.store.find(&id).unwrap().unwrap();
        assert!(deleted.deleted);
        assert!(deleted.deleted_at.is_some());
    }

    #[test]
    fn read_of_absent_document_is_not_found() {
        let fx = fixture();
        let result = fx.service.read(&CanonicalUuid::new(), &caller("user-a", &[]));
        assert!(matches!(result, Err(DocumentError::NotFound(_))));
    }

    #[test]
    fn read_of_soft_deleted_document_is_not_found() {
        let fx = fixture();
        let creator = caller("user-a", &[]);
        let documents = fx
            .service
            .create_from(&upload_command(&["content"], &[]), &creator)
            .unwrap();
        let id = documents[0].id.clone();

        fx.service.delete(&id, &creator, false).unwrap();
        assert!(matches!(
            fx.service.read(&id, &creator),
            Err(DocumentError::NotFound(_))
        ));
    }

    #[test]
    fn delete_denied_for_unrelated_caller() {
        let fx = fixture();
        let documents = fx
            .service
            .create_from(&upload_command(&["content"], &[]), &caller("user-a", &[]))
            .unwrap();
        let result = fx
            .service
            .delete(&documents[0].id, &caller("user-b", &["citizen"]), false);
        assert!(matches!(result, Err(DocumentError::Forbidden)));
    }

    #[test]
    fn soft_delete_is_idempotent_and_keeps_first_timestamp() {
        let fx = fixture();
        let creator = caller("user-a", &[]);
        let documents = fx
            .service
            .create_from(&upload_command(&["content"], &[]), &creator)
            .unwrap();
        let id = documents[0].id.clone();

        fx.service.delete(&id, &creator, false).unwrap();
        let first = fx.store.find(&id).unwrap().unwrap().deleted_at;

        fx.service.delete(&id, &creator, false).unwrap();
        let second = fx.store.find(&id).unwrap().unwrap().deleted_at;
        assert_eq!(first, second);
    }

    #[test]
    fn read_binary_returns_most_recent_content() {
        let fx = fixture();
        let creator = caller("user-a", &[]);
        let documents = fx
            .service
            .create_from(&upload_command(&["first"], &[]), &creator)
            .unwrap();
        let id = documents[0].id.clone();

        let (version, bytes) = fx.service.read_binary(&id, &creator).unwrap();
        assert_eq!(bytes, b"first");
        assert_eq!(version.id, documents[0].versions[0].id);
    }

    #[test]
    fn hard_delete_clears_all_versions() {
        let fx = fixture();
        let creator = caller("user-a", &[]);
        let documents = fx
            .service
            .create_from(&upload_command(&["content"], &[]), &creator)
            .unwrap();
        let id = documents[0].id.clone();

        fx.service.delete(&id, &creator, true).unwrap();

        let deleted = fx.store.find(&id).unwrap().unwrap();
        assert!(deleted.deleted);
        assert!(deleted.hard_deleted);
        assert!(deleted.versions.iter().all(|v| v.location.is_none()));

        let actions: Vec<AuditAction> = audit_lines(&fx, &id)
            .into_iter()
            .map(|e| e.action)
            .collect();
        assert_eq!(
            actions,
            vec![
                AuditAction::Created,
                AuditAction::SoftDeleted,
                AuditAction::ContentDeleted,
                AuditAction::HardDeleted,
            ]
        );
    }
}
