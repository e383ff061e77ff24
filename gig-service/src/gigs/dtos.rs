use crate::validators;
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct GigIdPath {
    #[validate(custom(function = "validators::uuid", message = "id must be a valid GUID"))]
    pub id: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateGigRequest {
    #[validate(
        required(message = "title is required"),
        length(min = 1, max = 120, message = "title must be between 1 and 120 characters")
    )]
    pub title: Option<String>,

    #[validate(length(max = 2000, message = "description length must be less than or equal to 2000 characters long"))]
    pub description: Option<String>,

    #[validate(range(min = 0.0, message = "budgetAmount must be greater than or equal to 0"))]
    pub budget_amount: Option<f64>,

    #[validate(length(max = 80, message = "locationCity length must be less than or equal to 80 characters long"))]
    pub location_city: Option<String>,

    #[validate(custom(function = "validators::timestamp", message = "gigDate must be an RFC 3339 timestamp"))]
    pub gig_date: Option<String>,
}

impl CreateGigRequest {
    pub const FIELDS: [&'static str; 5] = ["title", "description", "budgetAmount", "locationCity", "gigDate"];
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateGigRequest {
    #[validate(length(min = 1, max = 120, message = "title must be between 1 and 120 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 2000, message = "description length must be less than or equal to 2000 characters long"))]
    pub description: Option<String>,

    #[validate(range(min = 0.0, message = "budgetAmount must be greater than or equal to 0"))]
    pub budget_amount: Option<f64>,

    #[validate(length(max = 80, message = "locationCity length must be less than or equal to 80 characters long"))]
    pub location_city: Option<String>,

    #[validate(custom(function = "validators::timestamp", message = "gigDate must be an RFC 3339 timestamp"))]
    pub gig_date: Option<String>,

    #[validate(custom(
        function = "gig_status",
        message = "status must be one of [open, in_progress, completed, cancelled]"
    ))]
    pub status: Option<String>,
}

impl UpdateGigRequest {
    pub const FIELDS: [&'static str; 6] = [
        "title",
        "description",
        "budgetAmount",
        "locationCity",
        "gigDate",
        "status",
    ];
}

fn gig_status(value: &str) -> Result<(), validator::ValidationError> {
    match value {
        "open" | "in_progress" | "completed" | "cancelled" => Ok(()),
        _ => Err(validator::ValidationError::new("status")),
    }
}
