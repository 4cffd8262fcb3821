//! Blob content store adapter.
//!
//! This crate abstracts "put/get/delete binary by key" behind the
//! [`BlobStore`] trait so the document core never talks to a storage backend
//! directly. The contract distinguishes the outcomes the core cares about:
//!
//! - absence is reported as data ([`BlobError::NotFound`] on reads,
//!   [`DeleteOutcome::AlreadyAbsent`] on deletes), never conflated with
//!   backend failure;
//! - everything else is a genuine backend error that upper layers map to
//!   their storage-read/storage-write taxonomy.
//!
//! ## Keys and URIs
//!
//! Blob keys are canonical 32-hex identifiers (see `docstore-uuid`). Metadata
//! rows reference a stored blob by a `blob://<key>` URI; [`uri_for_key`] and
//! [`key_from_uri`] convert between the two and reject foreign schemes or
//! malformed keys.
//!
//! ## Filesystem implementation
//!
//! [`FsBlobStore`] stores each blob at `<root>/<k[0..2]>/<k[2..4]>/<k>`,
//! the same two-level sharding used for metadata rows, with the root
//! validated and canonicalised at construction.

mod store;

pub use store::{BlobStore, FsBlobStore};

use docstore_uuid::CanonicalUuid;

/// URI scheme under which stored blobs are referenced from metadata rows.
pub const BLOB_URI_SCHEME: &str = "blob://";

/// Errors from blob store operations.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// Root directory does not exist or is not a directory
    #[error("invalid blob root directory: {0}")]
    InvalidRootDirectory(String),

    /// Key is not a canonical identifier (rejects path traversal)
    #[error("invalid blob key: {0}")]
    InvalidKey(String),

    /// Content URI is malformed or uses a foreign scheme
    #[error("invalid content URI: {0}")]
    InvalidUri(String),

    /// No blob is stored under the requested key
    #[error("no blob stored under key: {0}")]
    NotFound(String),

    /// Backend I/O failure
    #[error("blob I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of a delete-if-exists call.
///
/// Both variants mean the blob is gone; `AlreadyAbsent` lets callers
/// implement idempotent deletion without treating a repeat delete as an
/// error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The blob existed and was removed by this call
    Deleted,
    /// No blob was stored under the key (e.g. already deleted)
    AlreadyAbsent,
}

/// Renders the `blob://<key>` URI for a stored blob.
pub fn uri_for_key(key: &str) -> String {
    format!("{BLOB_URI_SCHEME}{key}")
}

/// Extracts and validates the key from a `blob://<key>` URI.
///
/// # Errors
///
/// Returns [`BlobError::InvalidUri`] if the scheme is not `blob://` or the
/// embedded key is not canonical.
pub fn key_from_uri(uri: &str) -> Result<&str, BlobError> {
    let key = uri
        .strip_prefix(BLOB_URI_SCHEME)
        .ok_or_else(|| BlobError::InvalidUri(uri.to_owned()))?;
    if !CanonicalUuid::is_canonical(key) {
        return Err(BlobError::InvalidUri(uri.to_owned()));
    }
    Ok(key)
}
