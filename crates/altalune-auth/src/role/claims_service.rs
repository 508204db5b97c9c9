//! Claims Materialization
//!
//! Resolves a user's effective permissions and project memberships before
//! any access token is minted. The result is embedded in the token so
//! relying parties can compute capability locally.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::project::repository::ProjectMemberRepository;
use crate::role::entity::ROOT_PERMISSION;
use crate::role::repository::RoleRepository;
use crate::shared::error::Result;
use crate::user::entity::User;

/// Materialized token claims input.
#[derive(Debug, Clone, Default)]
pub struct UserClaims {
    /// Effective permissions, de-duplicated and sorted. If `root` is held,
    /// it is the sole entry.
    pub perms: Vec<String>,

    /// Project public id -> role
    pub memberships: BTreeMap<String, String>,
}

pub struct ClaimsService {
    roles: Arc<RoleRepository>,
    members: Arc<ProjectMemberRepository>,
}

impl ClaimsService {
    pub fn new(roles: Arc<RoleRepository>, members: Arc<ProjectMemberRepository>) -> Self {
        Self { roles, members }
    }

    /// Resolve the `perms` and `memberships` claims for a user.
    pub async fn resolve(&self, user: &User) -> Result<UserClaims> {
        let perms = self.effective_permissions(user).await?;

        let mut memberships = BTreeMap::new();
        for member in self.members.find_by_user(&user.id).await? {
            memberships.insert(member.project_id, member.role.as_str().to_string());
        }

        Ok(UserClaims { perms, memberships })
    }

    /// Union of role permissions and direct user permissions. When `root`
    /// appears anywhere, the whole set collapses to just `root`.
    async fn effective_permissions(&self, user: &User) -> Result<Vec<String>> {
        let mut set: BTreeSet<String> = user.permissions.iter().cloned().collect();

        for role in self.roles.find_by_codes(&user.roles).await? {
            set.extend(role.permissions.into_iter());
        }

        if set.contains(ROOT_PERMISSION) {
            return Ok(vec![ROOT_PERMISSION.to_string()]);
        }

        Ok(set.into_iter().collect())
    }
}

/// Server-side permission check against materialized claims.
///
/// `root` short-circuits to allow.
pub fn can(perms: &[String], permission: &str) -> bool {
    perms.iter().any(|p| p == ROOT_PERMISSION || p == permission)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_exact_match() {
        let perms = vec!["employee:read".to_string(), "employee:write".to_string()];
        assert!(can(&perms, "employee:read"));
        assert!(!can(&perms, "employee:delete"));
    }

    #[test]
    fn test_root_short_circuits() {
        let perms = vec![ROOT_PERMISSION.to_string()];
        assert!(can(&perms, "employee:delete"));
        assert!(can(&perms, "anything:whatsoever"));
    }

    #[test]
    fn test_empty_denies() {
        assert!(!can(&[], "employee:read"));
    }
}
