//! Caller identity for the current request.
//!
//! Authentication happens upstream; the core receives an already-verified
//! subject id and role set and only evaluates policy against them. Roles are
//! opaque strings issued by the identity collaborator; the core never
//! validates them beyond trimming.

use crate::error::DocumentResult;
use docstore_types::NonEmptyText;
use std::collections::BTreeSet;

/// The authenticated subject making the current request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caller {
    subject_id: NonEmptyText,
    roles: BTreeSet<String>,
}

impl Caller {
    /// Builds a caller from the externally authenticated identity.
    ///
    /// Role names are trimmed and blank entries dropped; an upstream identity
    /// provider occasionally emits padding around role claims.
    ///
    /// # Errors
    ///
    /// Returns an error if the subject id is blank.
    pub fn new(
        subject_id: impl AsRef<str>,
        roles: impl IntoIterator<Item = String>,
    ) -> DocumentResult<Self> {
        let subject_id = NonEmptyText::new(subject_id)?;
        let roles = roles
            .into_iter()
            .map(|r| r.trim().to_owned())
            .filter(|r| !r.is_empty())
            .collect();
        Ok(Self { subject_id, roles })
    }

    /// The authenticated subject id.
    pub fn subject_id(&self) -> &str {
        self.subject_id.as_str()
    }

    /// The subject id as a validated text value, for carrying into records.
    pub fn subject(&self) -> &NonEmptyText {
        &self.subject_id
    }

    /// The caller's role set.
    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    /// True if any of the caller's roles appears in the configured
    /// case-worker allowlist.
    pub fn is_case_worker(&self, case_worker_roles: &BTreeSet<String>) -> bool {
        self.roles.intersection(case_worker_roles).next().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_trims_roles_and_drops_blanks() {
        let caller = Caller::new(
            "user-1",
            vec![" citizen ".to_string(), String::new(), "clerk".to_string()],
        )
        .unwrap();
        assert_eq!(caller.subject_id(), "user-1");
        assert_eq!(caller.roles().len(), 2);
        assert!(caller.roles().contains("citizen"));
        assert!(caller.roles().contains("clerk"));
    }

    #[test]
    fn new_rejects_blank_subject() {
        assert!(Caller::new("  ", vec![]).is_err());
    }

    #[test]
    fn case_worker_membership_is_an_intersection() {
        let caller = Caller::new("user-1", vec!["clerk".to_string()]).unwrap();
        let allowlist: BTreeSet<String> = ["caseworker".to_string(), "clerk".to_string()]
            .into_iter()
            .collect();
        assert!(caller.is_case_worker(&allowlist));

        let other: BTreeSet<String> = ["caseworker".to_string()].into_iter().collect();
        assert!(!caller.is_case_worker(&other));
        assert!(!caller.is_case_worker(&BTreeSet::new()));
    }
}
