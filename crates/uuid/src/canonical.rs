//! The canonical identifier wrapper and its sharding logic.

use crate::{UuidError, UuidResult};
use std::path::{Path, PathBuf};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Docstore's canonical UUID representation (32 lowercase hex characters, no
/// hyphens).
///
/// Once constructed, the contained identifier is guaranteed to be in
/// canonical form, so storage-path derivation and equality checks are safe
/// without further validation.
///
/// # When to use this type
/// - Accepting an identifier from outside the core (CLI input, API request).
/// - Allocating a fresh identifier for a new document, version or blob key.
/// - Deriving a sharded storage path.
///
/// # Construction
/// - [`CanonicalUuid::new`] allocates a fresh v4 identifier.
/// - [`CanonicalUuid::parse`] validates an externally supplied string.
///
/// # Display format
/// Always the canonical 32-character lowercase hex form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalUuid(Uuid);

impl CanonicalUuid {
    /// Allocates a fresh identifier in canonical form.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and wraps an identifier that must already be canonical.
    ///
    /// Other common UUID spellings (hyphenated, uppercase) are **not**
    /// normalised; they are rejected so an identifier has exactly one on-disk
    /// representation.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if `input` is not 32 lowercase hex
    /// characters.
    pub fn parse(input: &str) -> UuidResult<Self> {
        if Self::is_canonical(input) {
            // is_canonical guarantees valid hex, so parse_str cannot fail.
            let uuid = Uuid::parse_str(input).expect("is_canonical guarantees a valid UUID");
            return Ok(Self(uuid));
        }
        Err(UuidError::InvalidInput(format!(
            "identifier must be 32 lowercase hex characters without hyphens, got: '{input}'"
        )))
    }

    /// Returns true if `input` is in canonical form.
    ///
    /// A purely syntactic check: exactly 32 bytes, all of them `0-9` or
    /// `a-f`.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    /// Returns the underlying `uuid::Uuid`.
    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Returns `parent/<s1>/<s2>/<id>` where `s1`/`s2` are the first two
    /// hex-character pairs of this identifier.
    ///
    /// This is the workspace-wide sharding scheme; it keeps any single
    /// directory's entry count bounded as the store grows.
    pub fn sharded_dir(&self, parent: &Path) -> PathBuf {
        let canonical = self.0.simple().to_string();
        let s1 = &canonical[0..2];
        let s2 = &canonical[2..4];
        parent.join(s1).join(s2).join(&canonical)
    }
}

impl Default for CanonicalUuid {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CanonicalUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for CanonicalUuid {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for CanonicalUuid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for CanonicalUuid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        CanonicalUuid::parse(&s).map_err(serde::de::Error::custom)
    }
}
