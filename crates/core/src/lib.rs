//! # Docstore Core
//!
//! Access-control and versioned-content core of the docstore document
//! service.
//!
//! The crate owns the decisions and the lifecycle, not the transport:
//!
//! - [`security`]: the pure domain permission evaluator (ownership, role
//!   matching, case-worker bypass) and its lookup fallback policy
//! - [`content`]: content version lifecycle, from checksum and blob placement
//!   to most-recent resolution and idempotent binary deletion
//! - [`documents`]: the document aggregate manager, consulted for every
//!   read/write, delegating binary work and recording the audit trail
//! - [`case`]: auditable, idempotent bulk deletion of a case's documents
//! - [`metadata`]: the row store seam plus a sharded filesystem
//!   implementation with per-document serialization
//! - [`config`]: startup-resolved configuration (storage roots, case-worker
//!   allowlist)
//!
//! **No API concerns**: HTTP routing, response shaping, multipart parsing and
//! authentication all belong to external collaborators. The core receives an
//! already-authenticated [`Caller`] and returns typed results; services are
//! constructed once at startup from [`CoreConfig`] and shared by `Arc`.

pub mod audit;
pub mod caller;
pub mod case;
pub mod config;
pub mod content;
pub mod document;
pub mod documents;
pub mod error;
pub mod metadata;
pub mod security;

pub use audit::{AuditAction, AuditEntry};
pub use caller::Caller;
pub use case::{CaseDeletionReport, CaseDeletionService};
pub use config::{case_worker_roles_from_env_value, CoreConfig};
pub use content::ContentVersionService;
pub use document::{
    Classification, ContentLocation, ContentVersion, StoredDocument, UploadedContent,
};
pub use documents::{StoredDocumentService, UploadDocumentsCommand};
pub use error::{DocumentError, DocumentResult};
pub use metadata::{FsMetadataStore, MetadataStore};
pub use security::{AccessControlled, AccessDecision, Permission, PermissionService};

pub use docstore_types::{CaseRef, NonEmptyText};
pub use docstore_uuid::{CanonicalUuid, Sha256Hash};
