use super::context::RequestContext;
use super::response::HandlerResponse;
use super::validation::ValidationSchema;
use crate::authz::{Permission, ResourceType, Role};
use crate::error::AppError;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Business logic behind one endpoint. Runs only after every configured
/// gate has passed.
#[async_trait]
pub trait RouteHandler: Send + Sync + 'static {
    async fn handle(&self, ctx: RequestContext) -> Result<HandlerResponse, AppError>;
}

/// Adapts an async closure to [`RouteHandler`]; see [`handler_fn`].
#[derive(Clone)]
pub struct HandlerFn<F> {
    f: F,
}

pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HandlerResponse, AppError>> + Send,
{
    HandlerFn { f }
}

#[async_trait]
impl<F, Fut> RouteHandler for HandlerFn<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HandlerResponse, AppError>> + Send,
{
    async fn handle(&self, ctx: RequestContext) -> Result<HandlerResponse, AppError> {
        (self.f)(ctx).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipRule {
    pub resource: ResourceType,
    pub param: String,
    pub admin_can_bypass: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("pipeline has no handler")]
    MissingHandler,

    #[error("ownership check on '{0}' names an empty path parameter")]
    EmptyOwnershipParam(ResourceType),
}

impl From<BuildError> for AppError {
    fn from(err: BuildError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

/// Frozen endpoint configuration. The executor only ever reads this.
#[derive(Clone)]
pub struct PipelineConfig {
    handler: Arc<dyn RouteHandler>,
    validator: Option<ValidationSchema>,
    is_private: bool,
    allowed_roles: BTreeSet<Role>,
    required_permissions: Vec<Permission>,
    ownership: Option<OwnershipRule>,
}

impl PipelineConfig {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn handler(&self) -> &Arc<dyn RouteHandler> {
        &self.handler
    }

    pub fn validator(&self) -> Option<&ValidationSchema> {
        self.validator.as_ref()
    }

    pub fn is_private(&self) -> bool {
        self.is_private
    }

    pub fn allowed_roles(&self) -> &BTreeSet<Role> {
        &self.allowed_roles
    }

    pub fn required_permissions(&self) -> &[Permission] {
        &self.required_permissions
    }

    pub fn ownership(&self) -> Option<&OwnershipRule> {
        self.ownership.as_ref()
    }
}

impl std::fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("validator", &self.validator)
            .field("is_private", &self.is_private)
            .field("allowed_roles", &self.allowed_roles)
            .field("required_permissions", &self.required_permissions)
            .field("ownership", &self.ownership)
            .finish_non_exhaustive()
    }
}

/// Fluent endpoint declaration. Calls may come in any order.
#[derive(Default)]
pub struct PipelineBuilder {
    handler: Option<Arc<dyn RouteHandler>>,
    validator: Option<ValidationSchema>,
    is_private: bool,
    allowed_roles: BTreeSet<Role>,
    required_permissions: Vec<Permission>,
    ownership: Option<OwnershipRule>,
}

impl PipelineBuilder {
    pub fn set_handler(mut self, handler: impl RouteHandler) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn set_validator(mut self, schema: ValidationSchema) -> Self {
        self.validator = Some(schema);
        self
    }

    pub fn mark_private(mut self) -> Self {
        self.is_private = true;
        self
    }

    /// Replaces any previously required set.
    pub fn require_permissions(mut self, permissions: impl IntoIterator<Item = Permission>) -> Self {
        self.required_permissions = permissions.into_iter().collect();
        self
    }

    /// Ownership of the resource named by the `id` path parameter; admins
    /// bypass.
    pub fn check_resource_ownership(self, resource: ResourceType) -> Self {
        self.check_resource_ownership_with(resource, "id", true)
    }

    pub fn check_resource_ownership_with(
        mut self,
        resource: ResourceType,
        param: impl Into<String>,
        admin_can_bypass: bool,
    ) -> Self {
        self.ownership = Some(OwnershipRule {
            resource,
            param: param.into(),
            admin_can_bypass,
        });
        self
    }

    /// Restricts the endpoint to `roles` and makes it private, even when
    /// `roles` is empty.
    pub fn only(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.allowed_roles = roles.into_iter().collect();
        self.is_private = true;
        self
    }

    /// Permission and ownership checks need a caller, so either one makes
    /// the endpoint private as well.
    pub fn build(self) -> Result<PipelineConfig, BuildError> {
        let handler = self.handler.ok_or(BuildError::MissingHandler)?;

        if let Some(rule) = &self.ownership {
            if rule.param.trim().is_empty() {
                return Err(BuildError::EmptyOwnershipParam(rule.resource));
            }
        }

        let mut required_permissions = Vec::with_capacity(self.required_permissions.len());
        for permission in self.required_permissions {
            if !required_permissions.contains(&permission) {
                required_permissions.push(permission);
            }
        }

        let is_private = self.is_private
            || !self.allowed_roles.is_empty()
            || !required_permissions.is_empty()
            || self.ownership.is_some();

        Ok(PipelineConfig {
            handler,
            validator: self.validator,
            is_private,
            allowed_roles: self.allowed_roles,
            required_permissions,
            ownership: self.ownership,
        })
    }
}
