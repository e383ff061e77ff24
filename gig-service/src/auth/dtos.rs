use crate::validators;
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SetRoleRequest {
    #[validate(
        required(message = "User Id is Required"),
        custom(function = "validators::uuid", message = "User Id is Required")
    )]
    pub user_id: Option<String>,

    #[validate(
        required(message = "Role is required and must be either employer or talent"),
        custom(
            function = "validators::assignable_role",
            message = "Role is required and must be either employer or talent"
        )
    )]
    pub role: Option<String>,
}
