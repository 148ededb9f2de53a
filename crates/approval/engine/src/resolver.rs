//! Approver resolution: who may act on a step

use crate::traits::IdentityDirectory;
use approval_types::{ApproverType, DirectoryResult, Identity, Step, UserId};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Answers eligibility questions for a step against the identity directory.
///
/// Unknown approver types never authorize anyone.
#[derive(Clone)]
pub struct ApproverResolver {
    directory: Arc<dyn IdentityDirectory>,
}

impl ApproverResolver {
    pub fn new(directory: Arc<dyn IdentityDirectory>) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> &Arc<dyn IdentityDirectory> {
        &self.directory
    }

    /// Whether `actor` may act on `step`
    pub async fn can_act(&self, actor: &UserId, step: &Step) -> DirectoryResult<bool> {
        let names = &step.approver_identifiers;
        match &step.approver_type {
            ApproverType::User => Ok(names.iter().any(|id| id == actor.as_str())),
            ApproverType::Role => self.directory.has_any_role(actor, names).await,
            ApproverType::Permission => self.directory.has_any_permission(actor, names).await,
            ApproverType::Unknown(raw) => {
                tracing::debug!(step = %step.id, approver_type = %raw, "Unknown approver type");
                Ok(false)
            }
        }
    }

    /// Every identity that may act on `step`, deduplicated and sorted by id
    pub async fn eligible_approvers(&self, step: &Step) -> DirectoryResult<Vec<Identity>> {
        let names = &step.approver_identifiers;
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let found = match &step.approver_type {
            ApproverType::User => self.directory.users_by_id(names).await?,
            ApproverType::Role => self.directory.users_with_role(names).await?,
            ApproverType::Permission => self.directory.users_with_permission(names).await?,
            ApproverType::Unknown(_) => Vec::new(),
        };

        let unique: BTreeMap<UserId, Identity> = found
            .into_iter()
            .map(|identity| (identity.id.clone(), identity))
            .collect();
        Ok(unique.into_values().collect())
    }
}

impl std::fmt::Debug for ApproverResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApproverResolver").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryDirectory;

    fn make_resolver() -> ApproverResolver {
        let directory = InMemoryDirectory::new()
            .with_identity(Identity::new("ana", "Ana").with_role("reviewer"))
            .with_identity(
                Identity::new("ben", "Ben")
                    .with_role("reviewer")
                    .with_role("approver"),
            )
            .with_identity(Identity::new("cy", "Cy").with_permission("payment.approve"));
        ApproverResolver::new(Arc::new(directory))
    }

    fn ids(identities: &[Identity]) -> Vec<&str> {
        identities.iter().map(|i| i.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_user_approvers() {
        let resolver = make_resolver();
        let step = Step::approval("s1", 1, "Named").approved_by_users(["cy", "ghost"]);

        assert!(resolver.can_act(&UserId::new("cy"), &step).await.unwrap());
        assert!(!resolver.can_act(&UserId::new("ana"), &step).await.unwrap());
        // unknown users can still be named; only directory entries are returned
        assert!(resolver.can_act(&UserId::new("ghost"), &step).await.unwrap());
        assert_eq!(ids(&resolver.eligible_approvers(&step).await.unwrap()), vec!["cy"]);
    }

    #[tokio::test]
    async fn test_role_approvers() {
        let resolver = make_resolver();
        let step = Step::approval("s1", 1, "Review").approved_by_roles(["reviewer", "approver"]);

        assert!(resolver.can_act(&UserId::new("ana"), &step).await.unwrap());
        assert!(!resolver.can_act(&UserId::new("cy"), &step).await.unwrap());
        assert_eq!(
            ids(&resolver.eligible_approvers(&step).await.unwrap()),
            vec!["ana", "ben"]
        );
    }

    #[tokio::test]
    async fn test_permission_approvers() {
        let resolver = make_resolver();
        let step = Step::approval("s1", 1, "Pay").approved_by_permissions(["payment.approve"]);

        assert!(resolver.can_act(&UserId::new("cy"), &step).await.unwrap());
        assert!(!resolver.can_act(&UserId::new("ben"), &step).await.unwrap());
        assert_eq!(ids(&resolver.eligible_approvers(&step).await.unwrap()), vec!["cy"]);
    }

    #[tokio::test]
    async fn test_unknown_type_fails_closed() {
        let resolver = make_resolver();
        let mut step = Step::approval("s1", 1, "Legacy").approved_by_roles(["reviewer"]);
        step.approver_type = ApproverType::Unknown("department_head".into());

        assert!(!resolver.can_act(&UserId::new("ana"), &step).await.unwrap());
        assert!(resolver.eligible_approvers(&step).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_identifiers() {
        let resolver = make_resolver();
        let step = Step::approval("s1", 1, "Nobody");
        assert!(!resolver.can_act(&UserId::new("ana"), &step).await.unwrap());
        assert!(resolver.eligible_approvers(&step).await.unwrap().is_empty());
    }
}
