use crate::validators;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct TalentIdPath {
    #[validate(custom(function = "validators::uuid", message = "id must be a valid GUID"))]
    pub id: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioPath {
    #[validate(custom(function = "validators::uuid", message = "id must be a valid GUID"))]
    pub id: String,

    #[validate(custom(function = "validators::uuid", message = "portfolioId must be a valid GUID"))]
    pub portfolio_id: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateTalentRequest {
    #[validate(custom(function = "validators::date", message = "dateOfBirth must be a date in YYYY-MM-DD format"))]
    pub date_of_birth: Option<String>,

    #[validate(length(min = 1, max = 60, message = "stageName must be between 1 and 60 characters"))]
    pub stage_name: Option<String>,

    #[validate(length(max = 300, message = "biography length must be less than or equal to 300 characters long"))]
    pub biography: Option<String>,
}

impl UpdateTalentRequest {
    pub const FIELDS: [&'static str; 3] = ["dateOfBirth", "stageName", "biography"];
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateReviewRequest {
    #[validate(range(min = 1, max = 5, message = "rating must be between 1 and 5"))]
    pub rating: i64,

    #[validate(length(max = 1000, message = "comment length must be less than or equal to 1000 characters long"))]
    pub comment: Option<String>,

    #[validate(custom(function = "validators::uuid", message = "gigId must be a valid GUID"))]
    pub gig_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReviewsQuery {
    #[validate(custom(
        function = "validators::page_number",
        message = "page must be an integer between 1 and 1000000"
    ))]
    pub page: Option<String>,

    #[validate(custom(
        function = "validators::page_size",
        message = "pageSize must be an integer between 1 and 100"
    ))]
    pub page_size: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatingCount {
    pub rating: u8,
    pub count: u64,
}

/// Aggregate over every review of one talent; all five ratings are listed
/// even when their count is zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub average_rating: f64,
    pub total_reviews: u64,
    pub ratings: Vec<RatingCount>,
}

impl RatingSummary {
    pub fn from_ratings(ratings: impl IntoIterator<Item = u8>) -> Self {
        let mut counts = [0u64; 5];
        for rating in ratings {
            if (1..=5).contains(&rating) {
                counts[usize::from(rating - 1)] += 1;
            }
        }

        let total_reviews: u64 = counts.iter().sum();
        let weighted: u64 = counts
            .iter()
            .zip(1u64..)
            .map(|(count, rating)| count * rating)
            .sum();
        let average_rating = if total_reviews == 0 {
            0.0
        } else {
            (weighted as f64 / total_reviews as f64 * 100.0).round() / 100.0
        };

        Self {
            average_rating,
            total_reviews,
            ratings: (1u8..=5)
                .rev()
                .map(|rating| RatingCount {
                    rating,
                    count: counts[usize::from(rating - 1)],
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn summary_of_no_reviews_is_zeroed() {
        let summary = RatingSummary::from_ratings(Vec::<u8>::new());
        assert_eq!(summary.average_rating, 0.0);
        assert_eq!(summary.total_reviews, 0);
        assert_eq!(summary.ratings.len(), 5);
    }

    #[test]
    fn summary_rounds_average_to_two_places() {
        let summary = RatingSummary::from_ratings([5, 4, 4]);
        assert_eq!(summary.average_rating, 4.33);
        assert_eq!(summary.ratings[0], RatingCount { rating: 5, count: 1 });
        assert_eq!(summary.ratings[1], RatingCount { rating: 4, count: 2 });
    }

    #[test]
    fn review_rating_is_bounded() {
        let review: CreateReviewRequest = serde_json::from_value(json!({"rating": 6})).unwrap();
        assert!(review.validate().is_err());

        let review: CreateReviewRequest =
            serde_json::from_value(json!({"rating": 5, "comment": "Great set"})).unwrap();
        assert!(review.validate().is_ok());
    }
}
