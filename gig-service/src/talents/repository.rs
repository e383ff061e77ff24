use super::dtos::{CreateReviewRequest, RatingSummary};
use serde_json::{Value, json};
use service_core::store::{
    FindManyQuery, Pagination, Row, RowStore, StoreError,
    casing::{row_to_camel, row_to_snake},
};
use std::sync::Arc;

pub const TALENTS_TABLE: &str = "talent_profiles";
pub const REVIEWS_TABLE: &str = "talent_reviews";
pub const PORTFOLIOS_TABLE: &str = "talent_portfolios";

#[derive(Clone)]
pub struct TalentRepository {
    store: Arc<dyn RowStore>,
}

impl TalentRepository {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self { store }
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Row>, StoreError> {
        let row = self.store.find_by_id(TALENTS_TABLE, id, None).await?;
        Ok(row.map(row_to_camel))
    }

    pub async fn find_by_user(&self, user_id: &str) -> Result<Option<Row>, StoreError> {
        let query = FindManyQuery::new()
            .filter("user_id", user_id)
            .paginate(Pagination { page: 1, page_size: 1 });
        let rows = self.store.find_many(TALENTS_TABLE, &query).await?;
        Ok(rows.into_iter().next().map(row_to_camel))
    }

    /// Returns the existing profile when the user already has one.
    pub async fn create_for_user(&self, user_id: &str) -> Result<Row, StoreError> {
        if let Some(existing) = self.find_by_user(user_id).await? {
            return Ok(existing);
        }

        let mut row = Row::new();
        row.insert("user_id".to_string(), Value::String(user_id.to_string()));
        row.insert("skills".to_string(), json!([]));

        let created = self.store.insert(TALENTS_TABLE, row).await?;
        Ok(row_to_camel(created))
    }

    pub async fn update(&self, id: &str, mut patch: Row) -> Result<Option<Row>, StoreError> {
        patch.insert(
            "updatedAt".to_string(),
            Value::String(chrono::Utc::now().to_rfc3339()),
        );
        let row = self
            .store
            .update_by_id(TALENTS_TABLE, id, row_to_snake(patch))
            .await?;
        Ok(row.map(row_to_camel))
    }

    pub async fn portfolios(&self, talent_id: &str) -> Result<Vec<Row>, StoreError> {
        let query = FindManyQuery::new()
            .filter("talent_id", talent_id)
            .order_by("created_at", false);
        let rows = self.store.find_many(PORTFOLIOS_TABLE, &query).await?;
        Ok(rows.into_iter().map(row_to_camel).collect())
    }

    /// Removes the item only when it belongs to `talent_id`.
    pub async fn delete_portfolio(&self, talent_id: &str, portfolio_id: &str) -> Result<bool, StoreError> {
        let belongs = self
            .store
            .find_by_id(PORTFOLIOS_TABLE, portfolio_id, Some(&["talent_id"][..]))
            .await?
            .and_then(|row| row.get("talent_id").and_then(Value::as_str).map(|t| t == talent_id))
            .unwrap_or(false);

        if !belongs {
            return Ok(false);
        }
        self.store.delete_by_id(PORTFOLIOS_TABLE, portfolio_id).await
    }

    pub async fn create_review(
        &self,
        talent_id: &str,
        reviewer_id: &str,
        review: &CreateReviewRequest,
    ) -> Result<Row, StoreError> {
        let row = match json!({
            "talent_id": talent_id,
            "reviewer_id": reviewer_id,
            "gig_id": review.gig_id,
            "comment": review.comment,
            "rating": review.rating,
        }) {
            Value::Object(row) => row,
            _ => return Err(StoreError::NotAnObject),
        };

        let created = self.store.insert(REVIEWS_TABLE, row).await?;
        Ok(row_to_camel(created))
    }

    /// Newest first.
    pub async fn reviews(&self, talent_id: &str, pagination: Pagination) -> Result<Vec<Row>, StoreError> {
        let query = FindManyQuery::new()
            .filter("talent_id", talent_id)
            .order_by("created_at", false)
            .paginate(pagination);
        let rows = self.store.find_many(REVIEWS_TABLE, &query).await?;
        Ok(rows.into_iter().map(row_to_camel).collect())
    }

    pub async fn rating_summary(&self, talent_id: &str) -> Result<RatingSummary, StoreError> {
        let query = FindManyQuery::new().filter("talent_id", talent_id);
        let rows = self.store.find_many(REVIEWS_TABLE, &query).await?;

        let ratings = rows
            .iter()
            .filter_map(|row| row.get("rating").and_then(Value::as_u64))
            .filter_map(|rating| u8::try_from(rating).ok());
        Ok(RatingSummary::from_ratings(ratings))
    }
}
