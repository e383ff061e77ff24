use service_core::store::{
    FindManyQuery, Pagination, Row, RowStore, StoreError,
    casing::{row_to_camel, row_to_snake},
};
use serde_json::Value;
use std::sync::Arc;

pub const USERS_TABLE: &str = "users";

const SEARCH_COLUMNS: [&str; 3] = ["first_name", "last_name", "username"];

/// Storage access for user records. Callers work in camelCase; rows are
/// converted at this boundary.
#[derive(Clone)]
pub struct UserRepository {
    store: Arc<dyn RowStore>,
}

#[derive(Debug, Default)]
pub struct UserFilter {
    pub role: Option<String>,
    pub search: Option<String>,
}

impl UserRepository {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self { store }
    }

    /// `columns` are storage names; the result is still camelCase.
    pub async fn find_by_id(&self, id: &str, columns: Option<&[&str]>) -> Result<Option<Row>, StoreError> {
        let row = self.store.find_by_id(USERS_TABLE, id, columns).await?;
        Ok(row.map(row_to_camel))
    }

    /// One page of users, newest first, plus the total matching count.
    pub async fn list(&self, filter: &UserFilter, pagination: Pagination) -> Result<(Vec<Row>, u64), StoreError> {
        let mut query = FindManyQuery::new();
        if let Some(role) = &filter.role {
            query = query.filter("role", role.as_str());
        }
        if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            query = query.search(&SEARCH_COLUMNS, term);
        }

        let total = self.store.count(USERS_TABLE, &query).await?;
        let rows = self
            .store
            .find_many(USERS_TABLE, &query.order_by("created_at", false).paginate(pagination))
            .await?;

        Ok((rows.into_iter().map(row_to_camel).collect(), total))
    }

    pub async fn update(&self, id: &str, mut patch: Row) -> Result<Option<Row>, StoreError> {
        patch.insert(
            "updatedAt".to_string(),
            Value::String(chrono::Utc::now().to_rfc3339()),
        );
        let row = self
            .store
            .update_by_id(USERS_TABLE, id, row_to_snake(patch))
            .await?;
        Ok(row.map(row_to_camel))
    }

    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        self.store.delete_by_id(USERS_TABLE, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use service_core::store::MemoryStore;

    async fn repository() -> UserRepository {
        let store = MemoryStore::new();
        store
            .seed(
                USERS_TABLE,
                vec![
                    json!({"id": "u1", "first_name": "Ada", "role": "talent", "created_at": "2024-01-01T00:00:00Z"}),
                    json!({"id": "u2", "first_name": "Grace", "role": "employer", "created_at": "2024-02-01T00:00:00Z"}),
                    json!({"id": "u3", "first_name": "Adele", "role": "talent", "created_at": "2024-03-01T00:00:00Z"}),
                ],
            )
            .await;
        UserRepository::new(Arc::new(store))
    }

    #[tokio::test]
    async fn find_by_id_returns_camel_case() {
        let repo = repository().await;
        let user = repo.find_by_id("u1", None).await.unwrap().unwrap();
        assert_eq!(user["firstName"], "Ada");
        assert!(repo.find_by_id("nope", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_filters_searches_and_orders_newest_first() {
        let repo = repository().await;
        let filter = UserFilter {
            role: Some("talent".to_string()),
            search: Some("ad".to_string()),
        };
        let (users, total) = repo.list(&filter, Pagination::normalize(None, None)).await.unwrap();

        assert_eq!(total, 2);
        let ids: Vec<_> = users.iter().map(|u| u["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["u3", "u1"]);
    }

    #[tokio::test]
    async fn update_writes_snake_case_columns() {
        let repo = repository().await;
        let mut patch = Row::new();
        patch.insert("lastName".to_string(), json!("Lovelace"));

        let user = repo.update("u1", patch).await.unwrap().unwrap();
        assert_eq!(user["lastName"], "Lovelace");
        assert!(user.contains_key("updatedAt"));
    }
}
