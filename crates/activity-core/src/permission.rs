//! Seam to the external role/permission engine.

use crate::subject::SubjectRef;
use crate::types::{RoleId, StateId, UserId};
use std::sync::Arc;

/// Permission code controlling edits; the default for editability checks.
pub const EDIT: &str = "edit";
/// Permission code controlling visibility.
pub const VIEW: &str = "view";

/// Decision functions required from the permission engine.
pub trait Authorizer: Send + Sync {
    /// Does `user` hold `permission` on `subject`?
    fn has_permission(&self, subject: &SubjectRef, user: &UserId, permission: &str) -> bool;

    /// Does `state` grant `permission` to `role`? Backs the role-filtered
    /// queries; the engine's state/role/permission relation answers it.
    fn state_grants(&self, state: &StateId, role: &RoleId, permission: &str) -> bool;
}

/// Thin façade over the [`Authorizer`]. No caching; an anonymous caller
/// (`None` user) is always denied.
#[derive(Clone)]
pub struct PermissionGate {
    authorizer: Arc<dyn Authorizer>,
}

impl PermissionGate {
    pub fn new(authorizer: Arc<dyn Authorizer>) -> Self {
        Self { authorizer }
    }

    pub fn has_permission(
        &self,
        subject: &SubjectRef,
        user: Option<&UserId>,
        permission: &str,
    ) -> bool {
        match user {
            Some(user) => self.authorizer.has_permission(subject, user, permission),
            None => false,
        }
    }

    pub fn state_grants_any(
        &self,
        state: &StateId,
        roles: &[RoleId],
        permission: &str,
    ) -> bool {
        roles
            .iter()
            .any(|role| self.authorizer.state_grants(state, role, permission))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
