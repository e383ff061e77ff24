use super::dtos::{CreateReviewRequest, ReviewsQuery, UpdateTalentRequest};
use super::repository::TalentRepository;
use crate::events::TalentProfileByUser;
use async_trait::async_trait;
use serde_json::{Value, json};
use service_core::error::AppError;
use service_core::events::EventBus;
use service_core::pipeline::{HandlerResponse, RequestContext, RouteHandler};
use service_core::store::{Pagination, Row};

const REVIEWS_PAGE_SIZE: u64 = 10;

fn talent_not_found() -> AppError {
    AppError::NotFound(anyhow::anyhow!("Talent not found"))
}

/// `GET /talents/:id`, keyed by the user id of the talent.
pub struct GetTalentProfile {
    pub events: EventBus,
}

#[async_trait]
impl RouteHandler for GetTalentProfile {
    async fn handle(&self, ctx: RequestContext) -> Result<HandlerResponse, AppError> {
        let user_id = ctx.require_param("id")?;

        let profile = self
            .events
            .dispatch::<TalentProfileByUser>(user_id.to_string())
            .await?
            .into_iter()
            .next()
            .ok_or_else(talent_not_found)?;

        Ok(HandlerResponse::ok("Talent Profile Retrieved Successfully").with_data(profile))
    }
}

pub struct UpdateTalent {
    pub repository: TalentRepository,
}

#[async_trait]
impl RouteHandler for UpdateTalent {
    async fn handle(&self, ctx: RequestContext) -> Result<HandlerResponse, AppError> {
        let id = ctx.require_param("id")?;

        let patch: Row = match &ctx.input {
            Value::Object(input) => input
                .iter()
                .filter(|(key, _)| UpdateTalentRequest::FIELDS.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            _ => Row::new(),
        };

        let talent = self
            .repository
            .update(id, patch)
            .await?
            .ok_or_else(talent_not_found)?;

        Ok(HandlerResponse::ok("Talent Updated Successfully").with_data(Value::Object(talent)))
    }
}

pub struct CreateReview {
    pub repository: TalentRepository,
}

#[async_trait]
impl RouteHandler for CreateReview {
    async fn handle(&self, ctx: RequestContext) -> Result<HandlerResponse, AppError> {
        let talent_id = ctx.require_param("id")?;
        let reviewer = ctx.identity()?;
        let review: CreateReviewRequest = ctx.input()?;

        self.repository
            .find_by_id(talent_id)
            .await?
            .ok_or_else(talent_not_found)?;

        let created = self
            .repository
            .create_review(talent_id, &reviewer.id, &review)
            .await?;

        tracing::info!(talent_id, reviewer_id = %reviewer.id, rating = review.rating, "Talent review created");
        Ok(HandlerResponse::created("Review Created Successfully").with_data(Value::Object(created)))
    }
}

pub struct ListReviews {
    pub repository: TalentRepository,
}

#[async_trait]
impl RouteHandler for ListReviews {
    async fn handle(&self, ctx: RequestContext) -> Result<HandlerResponse, AppError> {
        let talent_id = ctx.require_param("id")?;
        let query: ReviewsQuery = ctx.query_as()?;
        let pagination = Pagination::normalize_with(
            query.page.as_deref(),
            query.page_size.as_deref(),
            REVIEWS_PAGE_SIZE,
            Pagination::MAX_PAGE_SIZE,
        );

        let reviews = self.repository.reviews(talent_id, pagination).await?;
        let summary = self.repository.rating_summary(talent_id).await?;

        Ok(HandlerResponse::ok("Talent Reviews Retrieved Successfully").with_data(json!({
            "reviews": reviews,
            "summary": summary,
        })))
    }
}

pub struct ListPortfolios {
    pub repository: TalentRepository,
}

#[async_trait]
impl RouteHandler for ListPortfolios {
    async fn handle(&self, ctx: RequestContext) -> Result<HandlerResponse, AppError> {
        let talent_id = ctx.require_param("id")?;
        let portfolios = self.repository.portfolios(talent_id).await?;

        Ok(HandlerResponse::ok("Talent Portfolio Retrieved Successfully")
            .with_data(Value::Array(portfolios.into_iter().map(Value::Object).collect())))
    }
}

/// Stored files are left to the blob store; only the row goes.
pub struct DeletePortfolio {
    pub repository: TalentRepository,
}

#[async_trait]
impl RouteHandler for DeletePortfolio {
    async fn handle(&self, ctx: RequestContext) -> Result<HandlerResponse, AppError> {
        let talent_id = ctx.require_param("id")?;
        let portfolio_id = ctx.require_param("portfolioId")?;

        if !self.repository.delete_portfolio(talent_id, portfolio_id).await? {
            return Err(AppError::BadRequest(anyhow::anyhow!("Talent Portfolio not Found!")));
        }

        tracing::info!(talent_id, portfolio_id, "Talent portfolio deleted");
        Ok(HandlerResponse::no_content())
    }
}
