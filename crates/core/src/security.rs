//! Domain permission evaluation.
//!
//! The evaluator is a pure decision function: given a resource, a requested
//! permission and the caller's identity it returns allow or deny, with no
//! side effects and no I/O. "Access denied" is a decision, never an error;
//! translating a deny into a `Forbidden` response is the caller's job.
//!
//! Resource types opt into access control by implementing
//! [`AccessControlled`]; the evaluator is consulted through an explicit
//! [`ResourceLookup`] so that resources which are missing, or which carry no
//! access-control data at all, fall back to a distinct policy instead of
//! being conflated with a deny.

use crate::caller::Caller;
use std::collections::BTreeSet;
use std::fmt;

/// The permission a caller requests on a resource.
///
/// Current policy treats all three identically, but the permission is
/// threaded through every evaluation so per-action policies can diverge
/// without changing call sites.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Permission {
    Read,
    Update,
    Delete,
}

impl Permission {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "READ",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a permission evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny,
}

impl AccessDecision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Capability interface for resources under creator/role access control.
///
/// A resource type implements this to expose who created it and which roles
/// may act on it. Types that do not implement it are outside the domain
/// policy entirely; see [`ResourceLookup::Unrestricted`].
pub trait AccessControlled {
    /// Subject id of the creator.
    fn creator_id(&self) -> &str;

    /// Roles authorised to act on this resource.
    fn authorized_roles(&self) -> &BTreeSet<String>;
}

/// Evaluates the domain policy for one request.
///
/// Rules are applied in order, first match wins:
///
/// 1. the caller created the resource: allow;
/// 2. the caller holds one of the resource's authorised roles: allow;
/// 3. the caller holds a configured case-worker role: allow, bypassing
///    ownership and resource roles;
/// 4. otherwise: deny.
pub fn evaluate(
    resource: &dyn AccessControlled,
    permission: Permission,
    caller_id: &str,
    caller_roles: &BTreeSet<String>,
    case_worker_roles: &BTreeSet<String>,
) -> AccessDecision {
    match permission {
        // One shared rule chain for every permission today; splitting this
        // match is where a per-action policy would start.
        Permission::Read | Permission::Update | Permission::Delete => {
            if resource.creator_id() == caller_id {
                return AccessDecision::Allow;
            }
            if caller_roles
                .intersection(resource.authorized_roles())
                .next()
                .is_some()
            {
                return AccessDecision::Allow;
            }
            if caller_roles.intersection(case_worker_roles).next().is_some() {
                return AccessDecision::Allow;
            }
            AccessDecision::Deny
        }
    }
}

/// What an identifier lookup found, from the evaluator's point of view.
///
/// The distinction matters for the fallback policy: absence and
/// not-access-controlled both *allow* at this layer. An absent resource is
/// later surfaced as not-found by the caller; reporting it as forbidden here
/// would leak existence through the error shape.
pub enum ResourceLookup<'a> {
    /// No resource exists under the identifier.
    Missing,
    /// A resource exists but carries no access-control data.
    Unrestricted,
    /// A resource exists and is subject to the domain policy.
    Controlled(&'a dyn AccessControlled),
}

/// Permission evaluation wired to the process-wide case-worker allowlist.
///
/// Constructed once at startup from [`CoreConfig`](crate::config::CoreConfig)
/// and passed by reference into the services that need it.
#[derive(Clone, Debug)]
pub struct PermissionService {
    case_worker_roles: BTreeSet<String>,
}

impl PermissionService {
    /// Creates the service with the configured allowlist.
    pub fn new(case_worker_roles: BTreeSet<String>) -> Self {
        Self { case_worker_roles }
    }

    /// Evaluates the domain policy for an access-controlled resource.
    pub fn decide(
        &self,
        resource: &dyn AccessControlled,
        permission: Permission,
        caller: &Caller,
    ) -> AccessDecision {
        evaluate(
            resource,
            permission,
            caller.subject_id(),
            caller.roles(),
            &self.case_worker_roles,
        )
    }

    /// Evaluates the policy for a resource resolved by identifier.
    ///
    /// Missing and unrestricted resources are allowed unconditionally; only
    /// a controlled resource goes through the rule chain.
    pub fn decide_lookup(
        &self,
        lookup: ResourceLookup<'_>,
        permission: Permission,
        caller: &Caller,
    ) -> AccessDecision {
        match lookup {
            ResourceLookup::Missing | ResourceLookup::Unrestricted => AccessDecision::Allow,
            ResourceLookup::Controlled(resource) => self.decide(resource, permission, caller),
        }
    }
}
