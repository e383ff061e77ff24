use super::model::{AuthorizationModel, ResourceType};
use crate::error::AppError;
use crate::identity::Identity;

/// Client-facing reason for every ownership denial. A missing resource and
/// someone else's resource read the same.
pub const OWNERSHIP_DENIED: &str = "You can only access your own resources";

#[derive(Clone)]
pub struct OwnershipEvaluator {
    model: AuthorizationModel,
}

impl OwnershipEvaluator {
    pub fn new(model: AuthorizationModel) -> Self {
        Self { model }
    }

    pub async fn verify_ownership(
        &self,
        caller: &Identity,
        resource: ResourceType,
        resource_id: &str,
        admin_can_bypass: bool,
    ) -> Result<(), AppError> {
        if admin_can_bypass && caller.is_admin() {
            tracing::debug!(resource = %resource, resource_id, "Admin bypassed ownership check");
            return Ok(());
        }

        match self.model.owner_of(resource, resource_id).await {
            Some(owner) if owner == caller.id => Ok(()),
            owner => {
                tracing::info!(
                    resource = %resource,
                    resource_id,
                    caller = %caller.id,
                    resource_found = owner.is_some(),
                    "Ownership check denied"
                );
                Err(AppError::Forbidden(anyhow::anyhow!(OWNERSHIP_DENIED)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::Role;
    use crate::store::{FindManyQuery, MemoryStore, Row, RowStore, StoreError};
    use serde_json::json;
    use std::sync::Arc;

    async fn evaluator() -> OwnershipEvaluator {
        let store = MemoryStore::new();
        store
            .seed("gigs", vec![json!({"id": "r1", "employer_id": "u1"})])
            .await;
        OwnershipEvaluator::new(AuthorizationModel::new(Arc::new(store)))
    }

    fn denial_message(result: Result<(), AppError>) -> String {
        match result {
            Err(AppError::Forbidden(e)) => e.to_string(),
            other => panic!("expected forbidden, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn owner_is_allowed() {
        let evaluator = evaluator().await;
        let caller = Identity::new("u1").with_role(Role::Employer);
        assert!(evaluator.verify_ownership(&caller, ResourceType::Gig, "r1", true).await.is_ok());
    }

    #[tokio::test]
    async fn missing_and_foreign_resources_deny_identically() {
        let evaluator = evaluator().await;
        let caller = Identity::new("u2").with_role(Role::Talent);

        let foreign = evaluator.verify_ownership(&caller, ResourceType::Gig, "r1", true).await;
        let missing = evaluator.verify_ownership(&caller, ResourceType::Gig, "r404", true).await;

        assert_eq!(denial_message(foreign), OWNERSHIP_DENIED);
        assert_eq!(denial_message(missing), OWNERSHIP_DENIED);
    }

    struct UnavailableStore;

    #[async_trait::async_trait]
    impl RowStore for UnavailableStore {
        async fn find_by_id(&self, _: &str, _: &str, _: Option<&[&str]>) -> Result<Option<Row>, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn find_many(&self, _: &str, _: &FindManyQuery) -> Result<Vec<Row>, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn count(&self, _: &str, _: &FindManyQuery) -> Result<u64, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn insert(&self, _: &str, _: Row) -> Result<Row, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn update_by_id(&self, _: &str, _: &str, _: Row) -> Result<Option<Row>, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn delete_by_id(&self, _: &str, _: &str) -> Result<bool, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn health_check(&self) -> Result<(), StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }
    }

    #[tokio::test]
    async fn failed_lookup_denies_like_a_missing_resource() {
        let model = AuthorizationModel::new(Arc::new(UnavailableStore));
        assert_eq!(model.owner_of(ResourceType::Gig, "r1").await, None);

        let evaluator = OwnershipEvaluator::new(model);
        let caller = Identity::new("u1").with_role(Role::Employer);
        let result = evaluator.verify_ownership(&caller, ResourceType::Gig, "r1", true).await;

        assert_eq!(denial_message(result), OWNERSHIP_DENIED);
    }

    #[tokio::test]
    async fn admin_bypass_skips_the_lookup() {
        let evaluator = evaluator().await;
        let admin = Identity::new("a1").with_role(Role::Admin);

        assert!(evaluator.verify_ownership(&admin, ResourceType::Gig, "r404", true).await.is_ok());
        assert!(evaluator.verify_ownership(&admin, ResourceType::Gig, "r1", false).await.is_err());
    }
}
