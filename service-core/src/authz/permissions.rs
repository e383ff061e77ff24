use super::model::{AuthorizationModel, Permission};
use crate::events::{EventBus, UserGetById, UserLookup};
use std::collections::BTreeSet;

/// Answers "does this user hold these permissions". Any failure to resolve
/// the user or their role denies.
#[derive(Clone)]
pub struct PermissionEvaluator {
    model: AuthorizationModel,
    events: EventBus,
}

impl PermissionEvaluator {
    pub fn new(model: AuthorizationModel, events: EventBus) -> Self {
        Self { model, events }
    }

    async fn effective_permissions(&self, user_id: &str) -> Option<BTreeSet<Permission>> {
        let lookup = UserLookup::by_id(user_id).with_fields(&["role"]);

        let user = match self.events.dispatch::<UserGetById>(lookup).await {
            Ok(results) => results.into_iter().next(),
            Err(e) => {
                tracing::warn!(user_id, error = %e, "User lookup failed during permission check");
                return None;
            }
        };

        let Some(user) = user else {
            tracing::debug!(user_id, "Permission check for unknown user");
            return None;
        };

        let Some(role) = user.role else {
            tracing::debug!(user_id, "Permission check for user without a role");
            return None;
        };

        Some(self.model.permissions_for_role(role).await)
    }

    pub async fn user_has_permission(&self, user_id: &str, permission: Permission) -> bool {
        self.user_has_all_permissions(user_id, &[permission]).await
    }

    /// True when nothing is required, without touching the store.
    pub async fn user_has_all_permissions(&self, user_id: &str, required: &[Permission]) -> bool {
        if required.is_empty() {
            return true;
        }

        match self.effective_permissions(user_id).await {
            Some(granted) => required.iter().all(|p| granted.contains(p)),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::{ROLE_PERMISSIONS_TABLE, Role};
    use crate::identity::Identity;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn evaluator(store: &MemoryStore, events: &EventBus) -> PermissionEvaluator {
        PermissionEvaluator::new(AuthorizationModel::new(Arc::new(store.clone())), events.clone())
    }

    fn register_user(events: &EventBus, id: &'static str, role: Option<Role>) {
        events.register::<UserGetById, _, _>(move |lookup: UserLookup| async move {
            if lookup.id != id {
                return Ok(None);
            }
            let mut identity = Identity::new(id);
            identity.role = role;
            Ok(Some(identity))
        });
    }

    #[tokio::test]
    async fn empty_requirement_skips_the_lookup() {
        let events = EventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        {
            let calls = calls.clone();
            events.register::<UserGetById, _, _>(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(None) }
            });
        }
        let evaluator = evaluator(&MemoryStore::new(), &events);

        assert!(evaluator.user_has_all_permissions("nobody", &[]).await);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn defaults_apply_without_overrides() {
        let events = EventBus::new();
        register_user(&events, "u1", Some(Role::Employer));
        let evaluator = evaluator(&MemoryStore::new(), &events);

        assert!(evaluator.user_has_permission("u1", Permission::GigCreate).await);
        assert!(
            !evaluator
                .user_has_all_permissions("u1", &[Permission::GigCreate, Permission::PayoutRequest])
                .await
        );
    }

    #[tokio::test]
    async fn overrides_replace_defaults_entirely() {
        let store = MemoryStore::new();
        store
            .seed(
                ROLE_PERMISSIONS_TABLE,
                vec![json!({"role": "employer", "permission": "gig:read"})],
            )
            .await;
        let events = EventBus::new();
        register_user(&events, "u1", Some(Role::Employer));
        let evaluator = evaluator(&store, &events);

        assert!(evaluator.user_has_permission("u1", Permission::GigRead).await);
        assert!(!evaluator.user_has_permission("u1", Permission::GigCreate).await);
    }

    #[tokio::test]
    async fn unknown_or_roleless_users_are_denied() {
        let events = EventBus::new();
        register_user(&events, "fresh", None);
        let evaluator = evaluator(&MemoryStore::new(), &events);

        assert!(!evaluator.user_has_permission("ghost", Permission::UserRead).await);
        assert!(!evaluator.user_has_permission("fresh", Permission::UserRead).await);
    }

    #[tokio::test]
    async fn failing_user_lookup_denies() {
        let events = EventBus::new();
        events.register::<UserGetById, _, _>(|_| async { Err(anyhow::anyhow!("db down")) });
        let evaluator = evaluator(&MemoryStore::new(), &events);

        assert!(!evaluator.user_has_permission("u1", Permission::UserRead).await);
    }
}
