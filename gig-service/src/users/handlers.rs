use super::dtos::{ListUsersQuery, UpdateUserRequest};
use super::repository::{UserFilter, UserRepository};
use async_trait::async_trait;
use serde_json::{Value, json};
use service_core::error::AppError;
use service_core::pipeline::{HandlerResponse, RequestContext, RouteHandler};
use service_core::store::{Pagination, Row};

pub struct GetUser {
    pub repository: UserRepository,
}

#[async_trait]
impl RouteHandler for GetUser {
    async fn handle(&self, ctx: RequestContext) -> Result<HandlerResponse, AppError> {
        let id = ctx.require_param("id")?;

        let user = self
            .repository
            .find_by_id(id, None)
            .await?
            .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Invalid user ID")))?;

        Ok(HandlerResponse::ok("User Fetched Successfully").with_data(Value::Object(user)))
    }
}

pub struct ListUsers {
    pub repository: UserRepository,
}

#[async_trait]
impl RouteHandler for ListUsers {
    async fn handle(&self, ctx: RequestContext) -> Result<HandlerResponse, AppError> {
        let query: ListUsersQuery = ctx.query_as()?;
        let pagination = Pagination::normalize(query.page.as_deref(), query.page_size.as_deref());
        let filter = UserFilter {
            role: query.role,
            search: query.search,
        };

        let (users, total) = self.repository.list(&filter, pagination).await?;
        let total_pages = total.div_ceil(pagination.page_size);

        Ok(HandlerResponse::ok("Users Fetched Successfully").with_data(json!({
            "users": users,
            "pagination": {
                "page": pagination.page,
                "pageSize": pagination.page_size,
                "total": total,
                "totalPages": total_pages,
            },
        })))
    }
}

pub struct UpdateUser {
    pub repository: UserRepository,
}

#[async_trait]
impl RouteHandler for UpdateUser {
    async fn handle(&self, ctx: RequestContext) -> Result<HandlerResponse, AppError> {
        let id = ctx.require_param("id")?;

        // Keep explicit nulls so fields can be cleared.
        let patch: Row = match &ctx.input {
            Value::Object(input) => input
                .iter()
                .filter(|(key, _)| UpdateUserRequest::FIELDS.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            _ => Row::new(),
        };

        let user = self
            .repository
            .update(id, patch)
            .await?
            .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("User not Found!")))?;

        tracing::info!(user_id = id, "User profile updated");
        Ok(HandlerResponse::ok("User Updated Successfully").with_data(Value::Object(user)))
    }
}

pub struct DeleteUser {
    pub repository: UserRepository,
}

#[async_trait]
impl RouteHandler for DeleteUser {
    async fn handle(&self, ctx: RequestContext) -> Result<HandlerResponse, AppError> {
        let id = ctx.require_param("id")?;

        if !self.repository.delete(id).await? {
            return Err(AppError::BadRequest(anyhow::anyhow!("User not Found!")));
        }

        tracing::info!(user_id = id, "User deleted");
        Ok(HandlerResponse::no_content())
    }
}
