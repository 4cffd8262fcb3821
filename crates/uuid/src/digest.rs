//! Validated SHA-256 digest newtype.

use crate::{UuidError, UuidResult};
use std::fmt;

/// A SHA-256 digest in lowercase hexadecimal form (64 characters).
///
/// Used as the content checksum on stored versions. Construction validates
/// the format, so a `Sha256Hash` can be persisted and compared without
/// re-checking.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Sha256Hash(String);

impl Sha256Hash {
    /// Wraps the raw 32-byte digest output of a SHA-256 computation.
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Validates and wraps a hexadecimal digest string.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] unless the input is exactly 64
    /// lowercase hex characters.
    pub fn parse(input: &str) -> UuidResult<Self> {
        let valid = input.len() == 64
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if !valid {
            return Err(UuidError::InvalidInput(format!(
                "checksum must be 64 lowercase hex characters, got: '{input}'"
            )));
        }
        Ok(Self(input.to_owned()))
    }

    /// Returns the digest as a hex string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Sha256Hash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Sha256Hash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Sha256Hash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Sha256Hash::parse(&s).map_err(serde::de::Error::custom)
    }
}
