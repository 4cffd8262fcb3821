//! Case-wide document deletion.
//!
//! Given a case reference, [`CaseDeletionService`] soft-deletes every linked
//! document and clears the binaries of all their versions, as one auditable
//! batch. The batch has partial-failure semantics: one document's blob
//! failure is collected and the rest proceed.
//!
//! The workflow is idempotent. A re-run after a partial failure only does
//! real work on the documents that were not fully processed: soft-deleted
//! rows stay soft-deleted, already-cleared versions short-circuit, and a
//! blob the backend has since lost reports "already absent", which counts as
//! success.

use crate::audit::{AuditAction, AuditEntry, SYSTEM_ACTOR};
use crate::content::ContentVersionService;
use crate::error::DocumentResult;
use crate::metadata::MetadataStore;
use chrono::Utc;
use docstore_types::CaseRef;
use docstore_uuid::CanonicalUuid;
use std::sync::Arc;

/// Outcome of one case-deletion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseDeletionReport {
    /// Documents fully processed in this run: soft-deleted with every
    /// version's content cleared.
    pub deleted: usize,
    /// Documents left incomplete by a per-document failure; re-running the
    /// workflow retries exactly these.
    pub failed_ids: Vec<CanonicalUuid>,
}

/// Batch deletion of all documents linked to a case.
#[derive(Clone)]
pub struct CaseDeletionService {
    store: Arc<dyn MetadataStore>,
    content: ContentVersionService,
}

impl CaseDeletionService {
    pub fn new(store: Arc<dyn MetadataStore>, content: ContentVersionService) -> Self {
        Self { store, content }
    }

    /// Soft-deletes every document linked to `case_ref` and clears all
    /// version binaries, accumulating per-document failures instead of
    /// aborting.
    ///
    /// # Errors
    ///
    /// Only the initial case lookup can fail the whole run; everything after
    /// that is collected per document in the report.
    pub fn delete_all_for_case(&self, case_ref: &CaseRef) -> DocumentResult<CaseDeletionReport> {
        let ids = self.store.find_ids_by_case_ref(case_ref)?;

        let mut report = CaseDeletionReport {
            deleted: 0,
            failed_ids: Vec::new(),
        };
        for id in ids {
            match self.delete_one(&id) {
                Ok(()) => report.deleted += 1,
                Err(e) => {
                    tracing::warn!(
                        document = %id,
                        case_ref = %case_ref,
                        error = %e,
                        "case deletion failed for document, continuing with the rest"
                    );
                    report.failed_ids.push(id);
                }
            }
        }

        tracing::info!(
            case_ref = %case_ref,
            deleted = report.deleted,
            failed = report.failed_ids.len(),
            "case document deletion finished"
        );
        Ok(report)
    }

    fn delete_one(&self, id: &CanonicalUuid) -> DocumentResult<()> {
        let mut newly_deleted = false;
        let document = self.store.update(id, &mut |doc| {
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
                SYSTEM_ACTOR,
            ))?;
        }

        for version in &document.versions {
            if version.has_content() {
                self.content.delete_binary(version)?;
                self.store.append_audit(&AuditEntry::now_for_version(
                    id.clone(),
                    version.id.clone(),
                    AuditAction::ContentDeleted,
                    SYSTEM_ACTOR,
                ))?;
            }
        }
        Ok(())
    }
}
