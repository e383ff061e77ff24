use serde_json::Value;
use service_core::store::{
    Row, RowStore, StoreError,
    casing::{row_to_camel, row_to_snake},
};
use std::sync::Arc;

pub const GIGS_TABLE: &str = "gigs";

#[derive(Clone)]
pub struct GigRepository {
    store: Arc<dyn RowStore>,
}

impl GigRepository {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self { store }
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Row>, StoreError> {
        let row = self.store.find_by_id(GIGS_TABLE, id, None).await?;
        Ok(row.map(row_to_camel))
    }

    pub async fn create(&self, employer_id: &str, mut gig: Row) -> Result<Row, StoreError> {
        gig.insert("employerId".to_string(), Value::String(employer_id.to_string()));
        gig.entry("status").or_insert_with(|| Value::String("open".to_string()));

        let created = self.store.insert(GIGS_TABLE, row_to_snake(gig)).await?;
        Ok(row_to_camel(created))
    }

    pub async fn update(&self, id: &str, mut patch: Row) -> Result<Option<Row>, StoreError> {
        patch.insert(
            "updatedAt".to_string(),
            Value::String(chrono::Utc::now().to_rfc3339()),
        );
        let row = self
            .store
            .update_by_id(GIGS_TABLE, id, row_to_snake(patch))
            .await?;
        Ok(row.map(row_to_camel))
    }
}
