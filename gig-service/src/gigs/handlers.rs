use super::dtos::{CreateGigRequest, UpdateGigRequest};
use super::repository::GigRepository;
use async_trait::async_trait;
use serde_json::Value;
use service_core::error::AppError;
use service_core::pipeline::{HandlerResponse, RequestContext, RouteHandler};
use service_core::store::Row;

fn gig_not_found() -> AppError {
    AppError::NotFound(anyhow::anyhow!("Gig not found"))
}

/// Copies the listed body fields, explicit nulls included.
fn pick(input: &Value, fields: &[&str]) -> Row {
    match input {
        Value::Object(input) => input
            .iter()
            .filter(|(key, _)| fields.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
        _ => Row::new(),
    }
}

pub struct GetGig {
    pub repository: GigRepository,
}

#[async_trait]
impl RouteHandler for GetGig {
    async fn handle(&self, ctx: RequestContext) -> Result<HandlerResponse, AppError> {
        let id = ctx.require_param("id")?;
        let gig = self.repository.find_by_id(id).await?.ok_or_else(gig_not_found)?;
        Ok(HandlerResponse::ok("Gig Retrieved Successfully").with_data(Value::Object(gig)))
    }
}

pub struct CreateGig {
    pub repository: GigRepository,
}

#[async_trait]
impl RouteHandler for CreateGig {
    async fn handle(&self, ctx: RequestContext) -> Result<HandlerResponse, AppError> {
        let employer = ctx.identity()?;
        let gig = self
            .repository
            .create(&employer.id, pick(&ctx.input, &CreateGigRequest::FIELDS))
            .await?;

        tracing::info!(employer_id = %employer.id, gig_id = ?gig.get("id"), "Gig created");
        Ok(HandlerResponse::created("Gig Created Successfully").with_data(Value::Object(gig)))
    }
}

pub struct UpdateGig {
    pub repository: GigRepository,
}

#[async_trait]
impl RouteHandler for UpdateGig {
    async fn handle(&self, ctx: RequestContext) -> Result<HandlerResponse, AppError> {
        let id = ctx.require_param("id")?;
        let gig = self
            .repository
            .update(id, pick(&ctx.input, &UpdateGigRequest::FIELDS))
            .await?
            .ok_or_else(gig_not_found)?;

        Ok(HandlerResponse::ok("Gig Updated Successfully").with_data(Value::Object(gig)))
    }
}
