use crate::validators;
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct UserIdPath {
    #[validate(custom(function = "validators::uuid", message = "id must be a valid GUID"))]
    pub id: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersQuery {
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

    #[validate(custom(
        function = "validators::assignable_role",
        message = "role must be one of [talent, employer]"
    ))]
    pub role: Option<String>,

    #[validate(length(max = 100, message = "search length must be less than or equal to 100 characters long"))]
    pub search: Option<String>,
}

/// Profile fields a user may change. Every field accepts `null` to clear
/// it; unknown fields are rejected.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 60, message = "firstName must be between 1 and 60 characters"))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 60, message = "lastName must be between 1 and 60 characters"))]
    pub last_name: Option<String>,

    #[validate(length(max = 30, message = "phoneNumber length must be less than or equal to 30 characters long"))]
    pub phone_number: Option<String>,

    #[validate(length(max = 80, message = "locationCountry length must be less than or equal to 80 characters long"))]
    pub location_country: Option<String>,

    #[validate(length(max = 80, message = "locationCity length must be less than or equal to 80 characters long"))]
    pub location_city: Option<String>,

    #[validate(url(message = "profileImageUrl must be a valid uri"))]
    pub profile_image_url: Option<String>,

    #[validate(custom(function = "validators::gender", message = "gender must be one of [male, female]"))]
    pub gender: Option<String>,
}

impl UpdateUserRequest {
    pub const FIELDS: [&'static str; 7] = [
        "firstName",
        "lastName",
        "phoneNumber",
        "locationCountry",
        "locationCity",
        "profileImageUrl",
        "gender",
    ];
}
