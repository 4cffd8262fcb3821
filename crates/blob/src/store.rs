//! Blob store contract and the sharded filesystem implementation.

use crate::{BlobError, DeleteOutcome};
use docstore_uuid::CanonicalUuid;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Abstract binary store keyed by canonical identifiers.
///
/// Implementations are expected to be shared across request-handling threads
/// (`Send + Sync`); all operations are blocking I/O and callers must not hold
/// in-process locks across them.
///
/// Backends with network latency must bound every operation with a timeout
/// and surface an expired timeout as an ordinary `Err`: a timeout is never
/// evidence of absence, so it must not be reported as [`BlobError::NotFound`]
/// or [`DeleteOutcome::AlreadyAbsent`].
pub trait BlobStore: Send + Sync {
    /// Writes `bytes` under a fresh caller-chosen key.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError::InvalidKey`] for non-canonical keys and
    /// [`BlobError::Io`] on backend failure.
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), BlobError>;

    /// Reads the blob stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError::NotFound`] when no blob exists under the key and
    /// [`BlobError::Io`] on backend failure.
    fn get(&self, key: &str) -> Result<Vec<u8>, BlobError>;

    /// Removes the blob under `key` if it exists.
    ///
    /// Absence is a success ([`DeleteOutcome::AlreadyAbsent`]); only genuine
    /// backend failures return `Err`.
    fn delete_if_exists(&self, key: &str) -> Result<DeleteOutcome, BlobError>;
}

/// Filesystem-backed blob store.
///
/// Blobs are stored at `<root>/<k[0..2]>/<k[2..4]>/<k>`; the two-level
/// sharding bounds per-directory fan-out. The root directory is validated
/// and canonicalised once at construction, and keys are restricted to
/// canonical identifiers, so no computed path can escape the root.
#[derive(Debug)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Creates a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError::InvalidRootDirectory`] if `root` does not exist,
    /// is not a directory, or cannot be canonicalised.
    pub fn new(root: &Path) -> Result<Self, BlobError> {
        if !root.is_dir() {
            return Err(BlobError::InvalidRootDirectory(format!(
                "not an existing directory: {}",
                root.display()
            )));
        }
        let root = root.canonicalize().map_err(|e| {
            BlobError::InvalidRootDirectory(format!(
                "cannot canonicalise {}: {}",
                root.display(),
                e
            ))
        })?;
        Ok(Self { root })
    }

    /// Computes the sharded path for a validated key.
    fn blob_path(&self, key: &str) -> Result<PathBuf, BlobError> {
        if !CanonicalUuid::is_canonical(key) {
            return Err(BlobError::InvalidKey(key.to_owned()));
        }
        let s1 = &key[0..2];
        let s2 = &key[2..4];
        Ok(self.root.join(s1).join(s2).join(key))
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), BlobError> {
        let path = self.blob_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>, BlobError> {
        let path = self.blob_path(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(BlobError::NotFound(key.to_owned())),
            Err(e) => Err(BlobError::Io(e)),
        }
    }

    fn delete_if_exists(&self, key: &str) -> Result<DeleteOutcome, BlobError> {
        let path = self.blob_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(DeleteOutcome::Deleted),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(DeleteOutcome::AlreadyAbsent),
            Err(e) => Err(BlobError::Io(e)),
        }
    }
}
