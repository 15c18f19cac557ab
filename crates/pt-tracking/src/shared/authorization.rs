//! Authorization Policy
//!
//! Role-based access control. Every mutating route is gated by a
//! `<module>:<action>` permission; the role → permission mapping lives in
//! one declarative table so per-route checks cannot drift. Read access
//! only requires authentication.

use std::collections::HashSet;

use crate::shared::canon::Role;
use crate::shared::error::{Result, TrackingError};

/// Permission string constants.
pub mod permissions {
    /// Superuser wildcard.
    pub const ADMIN_ALL: &str = "*:*";

    pub const AUDIT_VIEW: &str = "audit:view";
    pub const USERS_MANAGE: &str = "users:manage";
}

/// All record modules gated by the standard create/edit/delete actions.
const RECORD_MODULES: &[&str] = &[
    "absenteeism",
    "losses",
    "errors",
    "production-speed",
    "machines",
    "maintenance",
    "employees",
    "products",
];

/// Production record modules a shift leader may create and edit.
const LEADER_MODULES: &[&str] = &["absenteeism", "losses", "errors", "production-speed"];

/// Resolve the permission set granted to a role.
///
/// ESPECTADOR is read-only and holds no mutation permissions at all.
pub fn permissions_for(role: Role) -> HashSet<String> {
    let mut perms = HashSet::new();
    match role {
        Role::Admin => {
            perms.insert(permissions::ADMIN_ALL.to_string());
        }
        Role::SupervisorProducao | Role::SupervisorQualidade => {
            for module in RECORD_MODULES {
                perms.insert(format!("{}:*", module));
            }
        }
        Role::LiderProducao => {
            for module in LEADER_MODULES {
                perms.insert(format!("{}:create", module));
                perms.insert(format!("{}:edit", module));
            }
        }
        Role::Espectador => {}
    }
    perms
}

/// Authorization context for a request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub permissions: HashSet<String>,
}

impl AuthContext {
    pub fn new(user_id: i64, name: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            user_id,
            name: name.into(),
            email: email.into(),
            role,
            permissions: permissions_for(role),
        }
    }

    /// Check if this context has a specific permission.
    pub fn has_permission(&self, permission: &str) -> bool {
        if self.permissions.contains(permission) {
            return true;
        }

        // Wildcard matching
        let parts: Vec<&str> = permission.split(':').collect();
        if parts.len() >= 2 {
            let wildcard = format!("{}:*", parts[0]);
            if self.permissions.contains(&wildcard) {
                return true;
            }
            if self.permissions.contains(permissions::ADMIN_ALL) {
                return true;
            }
        }

        false
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }
}

/// Require a specific permission; denial short-circuits before the
/// record service runs.
pub fn require_permission(context: &AuthContext, permission: &str) -> Result<()> {
    if context.has_permission(permission) {
        return Ok(());
    }
    Err(TrackingError::forbidden(format!(
        "Missing permission: {}",
        permission
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(role: Role) -> AuthContext {
        AuthContext::new(1, "Test User", "test@example.com", role)
    }

    #[test]
    fn test_admin_has_everything() {
        let admin = ctx(Role::Admin);
        assert!(admin.has_permission("losses:create"));
        assert!(admin.has_permission("users:manage"));
        assert!(admin.has_permission("audit:view"));
    }

    #[test]
    fn test_supervisor_full_record_access() {
        let sup = ctx(Role::SupervisorProducao);
        assert!(sup.has_permission("losses:create"));
        assert!(sup.has_permission("losses:delete"));
        assert!(sup.has_permission("machines:edit"));
        assert!(!sup.has_permission("users:manage"));
        assert!(!sup.has_permission("audit:view"));
    }

    #[test]
    fn test_leader_cannot_delete() {
        let leader = ctx(Role::LiderProducao);
        assert!(leader.has_permission("losses:create"));
        assert!(leader.has_permission("errors:edit"));
        assert!(!leader.has_permission("losses:delete"));
        assert!(!leader.has_permission("machines:create"));
    }

    #[test]
    fn test_espectador_is_read_only() {
        let viewer = ctx(Role::Espectador);
        assert!(!viewer.has_permission("losses:create"));
        assert!(!viewer.has_permission("absenteeism:edit"));
        assert!(!viewer.has_permission("errors:delete"));
    }

    #[test]
    fn test_require_permission_denies_with_forbidden() {
        let viewer = ctx(Role::Espectador);
        let err = require_permission(&viewer, "losses:create").unwrap_err();
        assert_eq!(err.code(), "FORBIDDEN");
    }
}
