//! Identifier and digest newtypes.
//!
//! Docstore keys every stored entity (documents, content versions, blob
//! objects) by a *canonical* UUID representation: **32 lowercase hexadecimal
//! characters, no hyphens**. Blob objects and metadata rows live under
//! sharded directories derived from that form, so path derivation must be
//! deterministic across the whole workspace.
//!
//! This crate provides:
//! - [`CanonicalUuid`], a wrapper that guarantees the canonical form once
//!   constructed, with shared sharding logic for storage paths.
//! - [`Sha256Hash`], a validated hexadecimal SHA-256 digest used as the
//!   content checksum on stored versions.
//!
//! ## Canonical UUID form
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`
//!
//! Externally supplied identifiers (CLI arguments, API paths) must already be
//! canonical; other common forms (hyphenated, uppercase) are rejected rather
//! than normalised, so that one identifier never has two on-disk spellings.
//!
//! ## Sharded layout
//! For a canonical identifier `k`, storage lives under
//! `parent/<k[0..2]>/<k[2..4]>/<k>`, which bounds the fan-out of any single
//! directory.

mod canonical;
mod digest;

pub use canonical::CanonicalUuid;
pub use digest::Sha256Hash;

/// Error type for identifier and digest validation.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
