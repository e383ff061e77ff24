//! Talent profiles, their reviews and portfolio items.
//!
//! Profiles are created on demand through `talent:create-talent` when a user
//! picks the talent role, and read by other modules through
//! `talent:get-by-user-id`.

pub mod dtos;
pub mod handlers;
pub mod listeners;
pub mod repository;

use axum::{Router, routing::{delete, get}};
use dtos::{CreateReviewRequest, PortfolioPath, ReviewsQuery, TalentIdPath, UpdateTalentRequest};
use handlers::{
    CreateReview, DeletePortfolio, GetTalentProfile, ListPortfolios, ListReviews, UpdateTalent,
};
use repository::TalentRepository;
use service_core::authz::{Permission, ResourceType};
use service_core::error::AppError;
use service_core::pipeline::{PipelineConfig, PipelineExecutor, ValidationSchema};

pub fn routes(executor: &PipelineExecutor, repository: TalentRepository) -> Result<Router, AppError> {
    let profile = PipelineConfig::builder()
        .set_validator(ValidationSchema::new().path::<TalentIdPath>())
        .set_handler(GetTalentProfile {
            events: executor.events().clone(),
        })
        .build()?;

    let update = PipelineConfig::builder()
        .set_validator(
            ValidationSchema::new()
                .body::<UpdateTalentRequest>()
                .path::<TalentIdPath>(),
        )
        .check_resource_ownership(ResourceType::Talent)
        .set_handler(UpdateTalent {
            repository: repository.clone(),
        })
        .build()?;

    let create_review = PipelineConfig::builder()
        .set_validator(
            ValidationSchema::new()
                .body::<CreateReviewRequest>()
                .path::<TalentIdPath>(),
        )
        .require_permissions([Permission::ReviewCreate])
        .set_handler(CreateReview {
            repository: repository.clone(),
        })
        .build()?;

    let list_reviews = PipelineConfig::builder()
        .set_validator(
            ValidationSchema::new()
                .query::<ReviewsQuery>()
                .path::<TalentIdPath>(),
        )
        .set_handler(ListReviews {
            repository: repository.clone(),
        })
        .build()?;

    let list_portfolios = PipelineConfig::builder()
        .set_validator(ValidationSchema::new().path::<TalentIdPath>())
        .set_handler(ListPortfolios {
            repository: repository.clone(),
        })
        .build()?;

    let delete_portfolio = PipelineConfig::builder()
        .set_validator(ValidationSchema::new().path::<PortfolioPath>())
        .check_resource_ownership_with(ResourceType::Portfolio, "portfolioId", true)
        .set_handler(DeletePortfolio { repository })
        .build()?;

    Ok(Router::new()
        .route(
            "/talents/:id",
            get(executor.endpoint(profile)).patch(executor.endpoint(update)),
        )
        .route(
            "/talents/:id/reviews",
            get(executor.endpoint(list_reviews)).post(executor.endpoint(create_review)),
        )
        .route("/talents/:id/portfolios", get(executor.endpoint(list_portfolios)))
        .route(
            "/talents/:id/portfolios/:portfolioId",
            delete(executor.endpoint(delete_portfolio)),
        ))
}
