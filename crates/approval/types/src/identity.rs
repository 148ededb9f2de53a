//! Identities as seen through the external directory

use crate::UserId;
use serde::{Deserialize, Serialize};

/// A user who may submit or act on approvals
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl Identity {
    pub fn new(id: impl Into<UserId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: None,
            roles: Vec::new(),
            permissions: Vec::new(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.push(permission.into());
        self
    }

    /// True if the identity holds at least one of `roles`
    pub fn has_any_role(&self, roles: &[String]) -> bool {
        roles.iter().any(|r| self.roles.contains(r))
    }

    /// True if the identity holds at least one of `permissions`
    pub fn has_any_permission(&self, permissions: &[String]) -> bool {
        permissions.iter().any(|p| self.permissions.contains(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_and_permission_membership() {
        let dana = Identity::new("dana", "Dana")
            .with_role("reviewer")
            .with_permission("budget.approve");

        assert!(dana.has_any_role(&["auditor".into(), "reviewer".into()]));
        assert!(!dana.has_any_role(&["auditor".into()]));
        assert!(!dana.has_any_role(&[]));
        assert!(dana.has_any_permission(&["budget.approve".into()]));
        assert!(!dana.has_any_permission(&["payment.approve".into()]));
    }
}
