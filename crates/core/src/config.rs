//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into services
//! by `Arc`. Environment variables are read only in binaries, never during
//! request handling, so behaviour stays consistent across worker threads and
//! test harnesses.
//!
//! The case-worker role allowlist is fixed for the lifetime of the process;
//! changing it requires a restart.

use crate::error::{DocumentError, DocumentResult};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Startup configuration for the document core.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    blob_dir: PathBuf,
    case_worker_roles: BTreeSet<String>,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// Role names are trimmed; an allowlist entry that is empty after
    /// trimming is rejected rather than silently dropped, since a blank
    /// privileged role would be unmatchable and almost certainly a
    /// configuration mistake.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::InvalidInput`] for blank allowlist entries.
    pub fn new(
        data_dir: PathBuf,
        blob_dir: PathBuf,
        case_worker_roles: impl IntoIterator<Item = String>,
    ) -> DocumentResult<Self> {
        let mut roles = BTreeSet::new();
        for role in case_worker_roles {
            let trimmed = role.trim();
            if trimmed.is_empty() {
                return Err(DocumentError::InvalidInput(
                    "case-worker role names cannot be empty".into(),
                ));
            }
            roles.insert(trimmed.to_owned());
        }

        Ok(Self {
            data_dir,
            blob_dir,
            case_worker_roles: roles,
        })
    }

    /// Root directory of the metadata row store.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Root directory of the blob content store.
    pub fn blob_dir(&self) -> &Path {
        &self.blob_dir
    }

    /// The configured case-worker role allowlist.
    pub fn case_worker_roles(&self) -> &BTreeSet<String> {
        &self.case_worker_roles
    }
}

/// Parse the case-worker allowlist from an optional environment value.
///
/// The value is a comma-separated list of role names; `None`, an empty value
/// and stray commas all yield fewer entries rather than errors, so the caller
/// can feed the raw environment string straight in.
pub fn case_worker_roles_from_env_value(value: Option<String>) -> BTreeSet<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_trims_and_sorts_roles() {
        let cfg = CoreConfig::new(
            PathBuf::from("/data"),
            PathBuf::from("/blobs"),
            vec![" caseworker ".to_string(), "admin".to_string()],
        )
        .unwrap();
        assert!(cfg.case_worker_roles().contains("caseworker"));
        assert!(cfg.case_worker_roles().contains("admin"));
        assert_eq!(cfg.case_worker_roles().len(), 2);
    }

    #[test]
    fn new_rejects_blank_role() {
        let result = CoreConfig::new(
            PathBuf::from("/data"),
            PathBuf::from("/blobs"),
            vec!["  ".to_string()],
        );
        assert!(matches!(result, Err(DocumentError::InvalidInput(_))));
    }

    #[test]
    fn empty_allowlist_is_allowed() {
        let cfg = CoreConfig::new(PathBuf::from("/data"), PathBuf::from("/blobs"), vec![]).unwrap();
        assert!(cfg.case_worker_roles().is_empty());
    }

    #[test]
    fn env_value_parsing() {
        assert!(case_worker_roles_from_env_value(None).is_empty());
        assert!(case_worker_roles_from_env_value(Some(String::new())).is_empty());

        let roles = case_worker_roles_from_env_value(Some("caseworker, admin ,,".into()));
        assert_eq!(
            roles.into_iter().collect::<Vec<_>>(),
            vec!["admin".to_string(), "caseworker".to_string()]
        );
    }
}
