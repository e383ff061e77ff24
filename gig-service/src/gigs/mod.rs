//! Gig postings owned by employers.

pub mod dtos;
pub mod handlers;
pub mod repository;

use axum::{
    Router,
    routing::{get, post},
};
use dtos::{CreateGigRequest, GigIdPath, UpdateGigRequest};
use handlers::{CreateGig, GetGig, UpdateGig};
use repository::GigRepository;
use service_core::authz::{Permission, ResourceType, Role};
use service_core::error::AppError;
use service_core::pipeline::{PipelineConfig, PipelineExecutor, ValidationSchema};

pub fn routes(executor: &PipelineExecutor, repository: GigRepository) -> Result<Router, AppError> {
    let create = PipelineConfig::builder()
        .set_validator(ValidationSchema::new().body::<CreateGigRequest>())
        .only([Role::Employer, Role::Admin])
        .require_permissions([Permission::GigCreate])
        .set_handler(CreateGig {
            repository: repository.clone(),
        })
        .build()?;

    let get_one = PipelineConfig::builder()
        .set_validator(ValidationSchema::new().path::<GigIdPath>())
        .set_handler(GetGig {
            repository: repository.clone(),
        })
        .build()?;

    let update = PipelineConfig::builder()
        .set_validator(
            ValidationSchema::new()
                .body::<UpdateGigRequest>()
                .path::<GigIdPath>(),
        )
        .require_permissions([Permission::GigUpdate])
        .check_resource_ownership(ResourceType::Gig)
        .set_handler(UpdateGig { repository })
        .build()?;

    Ok(Router::new()
        .route("/gigs", post(executor.endpoint(create)))
        .route(
            "/gigs/:id",
            get(executor.endpoint(get_one)).patch(executor.endpoint(update)),
        ))
}
