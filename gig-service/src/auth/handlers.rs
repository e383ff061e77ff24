use super::dtos::SetRoleRequest;
use crate::events::TalentCreate;
use crate::users::repository::UserRepository;
use async_trait::async_trait;
use serde_json::Value;
use service_core::authz::Role;
use service_core::error::AppError;
use service_core::events::EventBus;
use service_core::pipeline::{HandlerResponse, RequestContext, RouteHandler};
use service_core::store::Row;

/// One-time role choice after sign-up. Becoming a talent also creates the
/// talent profile through the event bus.
pub struct SetRole {
    pub users: UserRepository,
    pub events: EventBus,
}

#[async_trait]
impl RouteHandler for SetRole {
    async fn handle(&self, ctx: RequestContext) -> Result<HandlerResponse, AppError> {
        let request: SetRoleRequest = ctx.input()?;
        let (Some(user_id), Some(raw_role)) = (request.user_id, request.role) else {
            return Err(AppError::BadRequest(anyhow::anyhow!("Invalid credentials")));
        };
        let role: Role = raw_role
            .parse()
            .map_err(|e: String| AppError::BadRequest(anyhow::anyhow!(e)))?;

        let user = self
            .users
            .find_by_id(&user_id, None)
            .await?
            .ok_or_else(|| AppError::Conflict(anyhow::anyhow!("User not found.")))?;

        let current = user.get("role").and_then(Value::as_str).and_then(|r| r.parse::<Role>().ok());
        if current == Some(role) {
            return Err(AppError::Conflict(anyhow::anyhow!("User role already set.")));
        }

        let mut patch = Row::new();
        patch.insert("role".to_string(), Value::String(role.as_str().to_string()));
        let updated = self
            .users
            .update(&user_id, patch)
            .await?
            .ok_or_else(|| AppError::Conflict(anyhow::anyhow!("User not found.")))?;

        if role == Role::Talent {
            let profiles = self.events.dispatch::<TalentCreate>(user_id.clone()).await?;
            if profiles.is_empty() {
                return Err(AppError::InternalError(anyhow::anyhow!(
                    "Failed to create talent profile for user {}",
                    user_id
                )));
            }
        }

        tracing::info!(user_id = %user_id, role = %role, "User role set");
        Ok(HandlerResponse::created("User Role Set Successfully").with_data(Value::Object(updated)))
    }
}
