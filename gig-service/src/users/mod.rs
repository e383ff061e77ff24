//! User records: lookup for the pipeline, profile reads and edits, and
//! admin listing.

pub mod dtos;
pub mod handlers;
pub mod listeners;
pub mod repository;

use axum::{Router, routing::get};
use dtos::{ListUsersQuery, UpdateUserRequest, UserIdPath};
use handlers::{DeleteUser, GetUser, ListUsers, UpdateUser};
use repository::UserRepository;
use service_core::authz::{Permission, ResourceType, Role};
use service_core::error::AppError;
use service_core::pipeline::{PipelineConfig, PipelineExecutor, ValidationSchema};

pub use repository::USERS_TABLE;

pub fn routes(executor: &PipelineExecutor, repository: UserRepository) -> Result<Router, AppError> {
    let list = PipelineConfig::builder()
        .set_validator(ValidationSchema::new().query::<ListUsersQuery>())
        .only([Role::Admin])
        .set_handler(ListUsers {
            repository: repository.clone(),
        })
        .build()?;

    let get_one = PipelineConfig::builder()
        .mark_private()
        .set_validator(ValidationSchema::new().path::<UserIdPath>())
        .set_handler(GetUser {
            repository: repository.clone(),
        })
        .build()?;

    let update = PipelineConfig::builder()
        .set_validator(
            ValidationSchema::new()
                .body::<UpdateUserRequest>()
                .path::<UserIdPath>(),
        )
        .require_permissions([Permission::UserUpdate])
        .check_resource_ownership(ResourceType::User)
        .set_handler(UpdateUser {
            repository: repository.clone(),
        })
        .build()?;

    let delete = PipelineConfig::builder()
        .set_validator(ValidationSchema::new().path::<UserIdPath>())
        .only([Role::Admin])
        .set_handler(DeleteUser { repository })
        .build()?;

    Ok(Router::new()
        .route("/users", get(executor.endpoint(list)))
        .route(
            "/users/:id",
            get(executor.endpoint(get_one))
                .patch(executor.endpoint(update))
                .delete(executor.endpoint(delete)),
        ))
}
