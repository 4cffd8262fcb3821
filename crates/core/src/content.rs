//! Content version lifecycle.
//!
//! [`ContentVersionService`] owns every binary operation on a document's
//! version history: storing new content, resolving the most recent version,
//! streaming bytes back, and deleting binaries. It is the sole writer of the
//! URI/checksum pair; the pair is set when a version is staged and cleared
//! through the metadata store's atomic
//! [`clear_content_location`](crate::metadata::MetadataStore::clear_content_location).
//!
//! ## Deletion semantics
//!
//! Binary deletion tolerates eventual inconsistency between the blob store
//! and the metadata store without ever leaving the pair half-cleared:
//!
//! - blob removed, or blob already absent → clear URI + checksum together;
//! - any other backend failure → leave the row untouched, log, and surface a
//!   typed storage error so a bulk caller can collect it without aborting.
//!
//! Repeating a delete is therefore always safe: a cleared version
//! short-circuits, and a lingering blob reports `AlreadyAbsent` on retry.

use crate::document::{ContentLocation, ContentVersion, StoredDocument, UploadedContent};
use crate::error::{DocumentError, DocumentResult};
use crate::metadata::MetadataStore;
use chrono::Utc;
use docstore_blob::{key_from_uri, uri_for_key, BlobStore, DeleteOutcome};
use docstore_types::NonEmptyText;
use docstore_uuid::{CanonicalUuid, Sha256Hash};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Manages the binary content side of document versions.
#[derive(Clone)]
pub struct ContentVersionService {
    blob: Arc<dyn BlobStore>,
    store: Arc<dyn MetadataStore>,
}

impl ContentVersionService {
    pub fn new(blob: Arc<dyn BlobStore>, store: Arc<dyn MetadataStore>) -> Self {
        Self { blob, store }
    }

    /// Stores new content and appends it to the document's version history.
    ///
    /// Computes the SHA-256 checksum, sniffs a media type when the upload
    /// does not declare one, writes the bytes under a fresh version-id key
    /// and appends the version row with URI and checksum set together.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::StorageWrite`] if the blob write fails; no
    /// version row is persisted in that case. A metadata failure after the
    /// blob write triggers a best-effort blob cleanup before the error is
    /// returned.
    pub fn create_version(
        &self,
        document_id: &CanonicalUuid,
        upload: &UploadedContent,
    ) -> DocumentResult<ContentVersion> {
        let version = self.stage_version(document_id, upload)?;
        self.append_version(version)
    }

    /// Computes checksum and media type and writes the bytes to the blob
    /// store, returning a version that is not yet visible in metadata.
    ///
    /// Callers either append it ([`append_version`](Self::append_version)) or
    /// persist it as part of a fresh document row; on a later failure the
    /// staged blob must be discarded with
    /// [`discard_staged`](Self::discard_staged).
    pub(crate) fn stage_version(
        &self,
        document_id: &CanonicalUuid,
        upload: &UploadedContent,
    ) -> DocumentResult<ContentVersion> {
        let version_id = CanonicalUuid::new();

        let mut hasher = Sha256::new();
        hasher.update(&upload.bytes);
        let digest: [u8; 32] = hasher.finalize().into();
        let checksum = Sha256Hash::from_bytes(&digest);

        let mime_type = upload.mime_type.clone().or_else(|| {
            infer::get(&upload.bytes)
                .map(|kind| NonEmptyText::new(kind.mime_type()).expect("mime type is non-empty"))
        });

        let key = version_id.to_string();
        self.blob
            .put(&key, &upload.bytes)
            .map_err(DocumentError::StorageWrite)?;

        Ok(ContentVersion {
            id: version_id,
            document_id: document_id.clone(),
            size_bytes: upload.bytes.len() as u64,
            mime_type,
            original_filename: upload.original_filename.clone(),
            location: Some(ContentLocation {
                uri: NonEmptyText::new(uri_for_key(&key)).expect("blob URI is non-empty"),
                checksum,
            }),
            created_at: Utc::now(),
        })
    }

    /// Appends a staged version to its document row, serialized per document.
    ///
    /// On metadata failure the staged blob is discarded best-effort and the
    /// original error propagated, so no partial version becomes visible.
    pub(crate) fn append_version(&self, version: ContentVersion) -> DocumentResult<ContentVersion> {
        let document_id = version.document_id.clone();
        let pushed = version.clone();
        let result = self.store.update(&document_id, &mut |doc| {
            doc.versions.push(version.clone());
            Ok(())
        });
        match result {
            Ok(_) => Ok(pushed),
            Err(e) => {
                self.discard_staged(&pushed);
                Err(e)
            }
        }
    }

    /// Removes a staged blob that never became visible in metadata.
    ///
    /// Failures are logged, not propagated; the caller is already unwinding
    /// from the original error.
    pub(crate) fn discard_staged(&self, version: &ContentVersion) {
        let Some(location) = &version.location else {
            return;
        };
        let Ok(key) = key_from_uri(location.uri.as_str()) else {
            return;
        };
        if let Err(e) = self.blob.delete_if_exists(key) {
            tracing::warn!(
                version = %version.id,
                error = %e,
                "failed to discard staged blob after metadata failure"
            );
        }
    }

    /// The newest version of `document` whose binary is still present.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::NotFound`] when no version has content left.
    /// Under the creation invariant this cannot happen for a document whose
    /// binaries were never deleted, but it is handled rather than assumed.
    pub fn most_recent_version(&self, document: &StoredDocument) -> DocumentResult<ContentVersion> {
        document.current_version().cloned().ok_or_else(|| {
            DocumentError::NotFound(format!("document {} has no stored content", document.id))
        })
    }

    /// Reads the binary payload of a version.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::NotFound`] when the version's content has
    /// been deleted and [`DocumentError::StorageRead`] on backend failure
    /// (including a blob missing despite a live location: absence of bytes
    /// the metadata promises is a backend problem, not a policy outcome).
    pub fn read_binary(&self, version: &ContentVersion) -> DocumentResult<Vec<u8>> {
        let location = version.location.as_ref().ok_or_else(|| {
            DocumentError::NotFound(format!(
                "content of version {} has been deleted",
                version.id
            ))
        })?;
        let key = key_from_uri(location.uri.as_str()).map_err(|e| {
            DocumentError::InconsistentState(format!(
                "version {} has a malformed content URI: {e}",
                version.id
            ))
        })?;
        self.blob.get(key).map_err(DocumentError::StorageRead)
    }

    /// Deletes a version's binary and clears its URI/checksum pair.
    ///
    /// Idempotent: a version whose location is already cleared is a no-op,
    /// and a blob the backend reports as already absent still clears the
    /// pair.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::StorageWrite`] when the backend fails with
    /// anything other than absence; the row is left untouched so a retry can
    /// finish the job. The failure is logged here and not retried
    /// synchronously.
    pub fn delete_binary(&self, version: &ContentVersion) -> DocumentResult<()> {
        let Some(location) = &version.location else {
            return Ok(());
        };
        let key = key_from_uri(location.uri.as_str()).map_err(|e| {
            DocumentError::InconsistentState(format!(
                "version {} has a malformed content URI: {e}",
                version.id
            ))
        })?;

        match self.blob.delete_if_exists(key) {
            Ok(outcome) => {
                if outcome == DeleteOutcome::AlreadyAbsent {
                    tracing::info!(
                        version = %version.id,
                        "blob already absent, clearing content location"
                    );
                }
                self.store
                    .clear_content_location(&version.document_id, &version.id)
            }
            Err(e) => {
                tracing::warn!(
                    version = %version.id,
                    error = %e,
                    "blob delete failed, content location left in place"
                );
                Err(DocumentError::StorageWrite(e))
            }
        }
    }
}
