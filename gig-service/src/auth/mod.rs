//! Account setup that follows identity-provider sign-up.

pub mod dtos;
pub mod handlers;

use crate::users::repository::UserRepository;
use axum::{Router, routing::post};
use dtos::SetRoleRequest;
use handlers::SetRole;
use service_core::error::AppError;
use service_core::pipeline::{PipelineConfig, PipelineExecutor, ValidationSchema};

pub fn routes(executor: &PipelineExecutor, users: UserRepository) -> Result<Router, AppError> {
    let set_role = PipelineConfig::builder()
        .set_validator(ValidationSchema::new().body::<SetRoleRequest>())
        .set_handler(SetRole {
            users,
            events: executor.events().clone(),
        })
        .build()?;

    Ok(Router::new().route("/auth/set-role", post(executor.endpoint(set_role))))
}
