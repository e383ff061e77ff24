use super::builder::PipelineConfig;
use super::context::RequestContext;
use super::response::HandlerResponse;
use crate::authz::{AuthorizationModel, OwnershipEvaluator, PermissionEvaluator};
use crate::error::AppError;
use crate::events::{EventBus, UserGetById, UserLookup};
use crate::identity::{Identity, IdentityProvider};
use crate::middleware::RequestId;
use axum::{
    extract::Request,
    response::{IntoResponse, Response},
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::Instrument;

pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

const ROLE_DENIED: &str = "You do not have access to the requested resource";
const PERMISSION_DENIED: &str = "You do not have the required permissions to perform this action";

/// Runs configured endpoints: parse, validate, authenticate, role,
/// permission, ownership, handler, response. Each gate either passes or
/// ends the request with a classified error.
#[derive(Clone)]
pub struct PipelineExecutor {
    events: EventBus,
    identity_provider: Arc<dyn IdentityProvider>,
    permissions: PermissionEvaluator,
    ownership: OwnershipEvaluator,
    max_body_bytes: usize,
}

impl PipelineExecutor {
    pub fn new(
        events: EventBus,
        identity_provider: Arc<dyn IdentityProvider>,
        model: AuthorizationModel,
    ) -> Self {
        Self {
            permissions: PermissionEvaluator::new(model.clone(), events.clone()),
            ownership: OwnershipEvaluator::new(model),
            events,
            identity_provider,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Turns a frozen config into an axum handler:
    /// `post(executor.endpoint(config))`.
    pub fn endpoint(
        &self,
        config: PipelineConfig,
    ) -> impl Fn(Request) -> BoxFuture<'static, Response> + Clone + Send + Sync + 'static {
        let executor = self.clone();
        let config = Arc::new(config);
        move |req: Request| {
            let executor = executor.clone();
            let config = config.clone();
            let fut: BoxFuture<'static, Response> =
                Box::pin(async move { executor.execute(&config, req).await });
            fut
        }
    }

    pub async fn execute(&self, config: &PipelineConfig, req: Request) -> Response {
        let request_id = req
            .extensions()
            .get::<RequestId>()
            .map(|id| id.as_str().to_string())
            .unwrap_or_default();
        let span = tracing::info_span!(
            "pipeline",
            method = %req.method(),
            path = %req.uri().path(),
            request_id = %request_id,
            user_id = tracing::field::Empty,
        );

        async move {
            let ctx = RequestContext::from_request(req, self.max_body_bytes).await;
            match self.run(config, ctx).await {
                Ok((response, identity)) => {
                    let mut res = response.into_response();
                    if let Some(identity) = identity {
                        res.extensions_mut().insert(identity);
                    }
                    res
                }
                Err(err) => {
                    tracing::debug!(status = %err.status(), "Pipeline ended with error");
                    err.into_response()
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        config: &PipelineConfig,
        mut ctx: RequestContext,
    ) -> Result<(HandlerResponse, Option<Identity>), AppError> {
        if let Some(schema) = config.validator() {
            schema.validate(&ctx)?;
        }

        if config.is_private() {
            let identity = self.authenticate(&mut ctx).await?;
            tracing::Span::current().record("user_id", identity.id.as_str());

            if !config.allowed_roles().is_empty() {
                let allowed = identity
                    .role
                    .is_some_and(|role| config.allowed_roles().contains(&role));
                if !allowed {
                    tracing::info!(role = ?identity.role, "Role not allowed");
                    return Err(AppError::Forbidden(anyhow::anyhow!(ROLE_DENIED)));
                }
            }

            if !config.required_permissions().is_empty()
                && !self
                    .permissions
                    .user_has_all_permissions(&identity.id, config.required_permissions())
                    .await
            {
                tracing::info!(required = ?config.required_permissions(), "Missing permissions");
                return Err(AppError::Forbidden(anyhow::anyhow!(PERMISSION_DENIED)));
            }

            if let Some(rule) = config.ownership() {
                let resource_id = ctx.require_param(&rule.param)?;
                self.ownership
                    .verify_ownership(&identity, rule.resource, resource_id, rule.admin_can_bypass)
                    .await?;
            }

            ctx.identity = Some(identity);
        }

        let identity = ctx.identity.clone();
        let mut headers = std::mem::take(&mut ctx.response_headers);
        let mut response = config.handler().handle(ctx).await?;

        headers.extend(response.headers.drain());
        response.headers = headers;

        Ok((response, identity))
    }

    /// Reuses an identity attached earlier in the request lifecycle,
    /// otherwise resolves the bearer token through the provider and the
    /// local profile through the event bus.
    async fn authenticate(&self, ctx: &mut RequestContext) -> Result<Identity, AppError> {
        if let Some(identity) = ctx.extensions().get::<Identity>() {
            return Ok(identity.clone());
        }

        let Some(Authorization(bearer)) = ctx.headers().typed_get::<Authorization<Bearer>>() else {
            return Err(AppError::Unauthorized(anyhow::anyhow!(
                "Authorization header missing or invalid"
            )));
        };

        let external = self
            .identity_provider
            .user_from_token(bearer.token())
            .await?
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Invalid or expired token")))?;

        let identity = self
            .events
            .dispatch::<UserGetById>(UserLookup::by_id(&external.id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("User profile not found")))?;

        ctx.extensions_mut().insert(identity.clone());
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::{OWNERSHIP_DENIED, Permission, ResourceType, Role};
    use crate::identity::{ExternalUser, ProviderError};
    use crate::pipeline::{RouteHandler, ValidationSchema, handler_fn};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use axum::{
        Router,
        body::Body,
        http::{StatusCode, header},
        routing::{get, patch, post},
    };
    use serde::Deserialize;
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;
    use validator::Validate;

    struct TokenTable(HashMap<&'static str, &'static str>);

    #[async_trait]
    impl IdentityProvider for TokenTable {
        async fn user_from_token(&self, token: &str) -> Result<Option<ExternalUser>, ProviderError> {
            Ok(self.0.get(token).map(|id| ExternalUser {
                id: id.to_string(),
                email: None,
            }))
        }
    }

    async fn executor() -> PipelineExecutor {
        let store = MemoryStore::new();
        store
            .seed("gigs", vec![json!({"id": "r1", "employer_id": "u1"})])
            .await;

        let events = EventBus::new();
        let users: HashMap<&'static str, Role> = HashMap::from([
            ("u1", Role::Employer),
            ("u2", Role::Talent),
            ("a1", Role::Admin),
        ]);
        events.register::<UserGetById, _, _>(move |lookup: UserLookup| {
            let found = users
                .get(lookup.id.as_str())
                .map(|role| Identity::new(lookup.id.clone()).with_role(*role));
            async move { Ok(found) }
        });

        let provider = TokenTable(HashMap::from([
            ("t-u1", "u1"),
            ("t-u2", "u2"),
            ("t-a1", "a1"),
            ("t-ghost", "ghost"),
        ]));

        PipelineExecutor::new(events, Arc::new(provider), AuthorizationModel::new(Arc::new(store)))
    }

    fn counting(calls: &Arc<AtomicUsize>) -> impl RouteHandler {
        let calls = calls.clone();
        handler_fn(move |ctx: RequestContext| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                let caller = ctx.identity.as_ref().map(|i| i.id.clone());
                Ok(HandlerResponse::ok("done").with_data(json!({ "caller": caller })))
            }
        })
    }

    async fn send(
        app: Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(body) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };

        let res = app.oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn role_outside_allowed_set_is_forbidden_before_the_handler() {
        let executor = executor().await;
        let calls = Arc::new(AtomicUsize::new(0));
        let config = PipelineConfig::builder()
            .set_handler(counting(&calls))
            .only([Role::Admin])
            .build()
            .unwrap();
        let app = Router::new().route("/admin", get(executor.endpoint(config)));

        let (status, body) = send(app, "GET", "/admin", Some("t-u1"), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], ROLE_DENIED);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_or_unknown_tokens_are_unauthorized() {
        let executor = executor().await;
        let calls = Arc::new(AtomicUsize::new(0));
        let config = PipelineConfig::builder()
            .set_handler(counting(&calls))
            .mark_private()
            .build()
            .unwrap();
        let app = Router::new().route("/me", get(executor.endpoint(config)));

        let (status, body) = send(app.clone(), "GET", "/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Unauthorized");

        let (status, _) = send(app.clone(), "GET", "/me", Some("expired"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(app, "GET", "/me", Some("t-ghost"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[derive(Deserialize, Validate)]
    struct Rename {
        #[validate(length(min = 1, message = "title is not allowed to be empty"))]
        title: String,
    }

    #[tokio::test]
    async fn validation_runs_before_authentication() {
        let executor = executor().await;
        let calls = Arc::new(AtomicUsize::new(0));
        let config = PipelineConfig::builder()
            .set_handler(counting(&calls))
            .set_validator(ValidationSchema::new().body::<Rename>())
            .mark_private()
            .build()
            .unwrap();
        let app = Router::new().route("/gigs", post(executor.endpoint(config)));

        let (status, body) = send(app.clone(), "POST", "/gigs", None, Some(json!({"title": ""}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["message"], "title is not allowed to be empty");

        let (status, _) = send(app, "POST", "/gigs", None, Some(json!({"title": "DJ"}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    fn ownership_app(executor: &PipelineExecutor, calls: &Arc<AtomicUsize>) -> Router {
        let config = PipelineConfig::builder()
            .set_handler(counting(calls))
            .check_resource_ownership(ResourceType::Gig)
            .build()
            .unwrap();
        Router::new().route("/gigs/:id", patch(executor.endpoint(config)))
    }

    #[tokio::test]
    async fn non_owner_gets_the_generic_ownership_denial() {
        let executor = executor().await;
        let calls = Arc::new(AtomicUsize::new(0));
        let app = ownership_app(&executor, &calls);

        let (status, body) = send(app.clone(), "PATCH", "/gigs/r1", Some("t-u2"), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], OWNERSHIP_DENIED);

        let (status, body) = send(app, "PATCH", "/gigs/r404", Some("t-u2"), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], OWNERSHIP_DENIED);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn owner_and_admin_reach_the_handler() {
        let executor = executor().await;
        let calls = Arc::new(AtomicUsize::new(0));
        let app = ownership_app(&executor, &calls);

        let (status, body) = send(app.clone(), "PATCH", "/gigs/r1", Some("t-u1"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["caller"], "u1");

        let (status, body) = send(app, "PATCH", "/gigs/r1", Some("t-a1"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["caller"], "a1");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn missing_ownership_param_is_a_bad_request() {
        let executor = executor().await;
        let calls = Arc::new(AtomicUsize::new(0));
        let config = PipelineConfig::builder()
            .set_handler(counting(&calls))
            .check_resource_ownership_with(ResourceType::Gig, "gigId", true)
            .build()
            .unwrap();
        let app = Router::new().route("/gigs/:id", patch(executor.endpoint(config)));

        let (status, body) = send(app, "PATCH", "/gigs/r1", Some("t-u1"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Missing path parameter: gigId");
    }

    #[tokio::test]
    async fn missing_permission_is_forbidden() {
        let executor = executor().await;
        let calls = Arc::new(AtomicUsize::new(0));
        let config = PipelineConfig::builder()
            .set_handler(counting(&calls))
            .require_permissions([Permission::PayoutRequest])
            .build()
            .unwrap();
        let app = Router::new().route("/payouts", post(executor.endpoint(config)));

        let (status, body) = send(app.clone(), "POST", "/payouts", Some("t-u1"), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], PERMISSION_DENIED);

        let (status, _) = send(app, "POST", "/payouts", Some("t-u2"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn identity_already_on_the_request_is_reused() {
        let executor = executor().await;
        let calls = Arc::new(AtomicUsize::new(0));
        let config = PipelineConfig::builder()
            .set_handler(counting(&calls))
            .mark_private()
            .build()
            .unwrap();

        let mut req = Request::builder().uri("/me").body(Body::empty()).unwrap();
        req.extensions_mut()
            .insert(Identity::new("session-user").with_role(Role::Talent));

        let res = executor.execute(&config, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.extensions().get::<Identity>().map(|i| i.id.as_str()),
            Some("session-user")
        );
    }

    #[tokio::test]
    async fn handler_errors_use_the_same_envelope() {
        let executor = executor().await;
        let config = PipelineConfig::builder()
            .set_handler(handler_fn(|_ctx: RequestContext| async {
                Err::<HandlerResponse, _>(AppError::Conflict(anyhow::anyhow!("User role already set.")))
            }))
            .build()
            .unwrap();
        let app = Router::new().route("/roles", post(executor.endpoint(config)));

        let (status, body) = send(app, "POST", "/roles", None, Some(json!({}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body, json!({"message": "User role already set."}));
    }

    #[tokio::test]
    async fn context_headers_merge_with_handler_headers() {
        let executor = executor().await;
        let config = PipelineConfig::builder()
            .set_handler(handler_fn(|_ctx: RequestContext| async {
                Ok(HandlerResponse::no_content().with_header(
                    header::CACHE_CONTROL,
                    header::HeaderValue::from_static("no-store"),
                ))
            }))
            .build()
            .unwrap();

        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let res = executor.execute(&config, req).await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        assert_eq!(res.headers()[header::CACHE_CONTROL], "no-store");
    }
}
