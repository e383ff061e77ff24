//! Field rules shared by the request schemas of several feature modules.
//!
//! Query strings and path segments arrive as text, so numeric rules here
//! parse before they compare.

use service_core::store::Pagination;
use std::borrow::Cow;
use validator::ValidationError;

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

pub fn uuid(value: &str) -> Result<(), ValidationError> {
    uuid::Uuid::parse_str(value)
        .map(|_| ())
        .map_err(|_| invalid("uuid", "must be a valid GUID"))
}

pub fn page_number(value: &str) -> Result<(), ValidationError> {
    match value.trim().parse::<u64>() {
        Ok(n) if (1..=Pagination::MAX_PAGE).contains(&n) => Ok(()),
        _ => Err(invalid("page", "must be an integer between 1 and 1000000")),
    }
}

pub fn page_size(value: &str) -> Result<(), ValidationError> {
    match value.trim().parse::<u64>() {
        Ok(n) if (1..=100).contains(&n) => Ok(()),
        _ => Err(invalid("page_size", "must be an integer between 1 and 100")),
    }
}

pub fn assignable_role(value: &str) -> Result<(), ValidationError> {
    match value {
        "talent" | "employer" => Ok(()),
        _ => Err(invalid("role", "must be one of [talent, employer]")),
    }
}

pub fn gender(value: &str) -> Result<(), ValidationError> {
    match value {
        "male" | "female" => Ok(()),
        _ => Err(invalid("gender", "must be one of [male, female]")),
    }
}

/// Calendar date as `YYYY-MM-DD`.
pub fn date(value: &str) -> Result<(), ValidationError> {
    chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| invalid("date", "must be a date in YYYY-MM-DD format"))
}

pub fn timestamp(value: &str) -> Result<(), ValidationError> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|_| ())
        .map_err(|_| invalid("timestamp", "must be an RFC 3339 timestamp"))
}
