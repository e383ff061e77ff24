pub mod auth;
pub mod config;
pub mod db;
pub mod events;
pub mod gigs;
pub mod talents;
pub mod users;
pub mod validators;

use axum::{
    extract::State,
    http::{HeaderValue, Method, header},
    middleware::from_fn,
    routing::get,
    Json, Router,
};
use service_core::authz::AuthorizationModel;
use service_core::error::AppError;
use service_core::events::EventBus;
use service_core::identity::IdentityProvider;
use service_core::middleware::{REQUEST_ID_HEADER, request_id_middleware};
use service_core::pipeline::PipelineExecutor;
use service_core::store::RowStore;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::GigConfig;
use crate::events::{AppUp, RegistrationSuccessful};
use crate::gigs::repository::GigRepository;
use crate::talents::repository::TalentRepository;
use crate::users::repository::UserRepository;

#[derive(Clone)]
pub struct AppState {
    pub config: GigConfig,
    pub store: Arc<dyn RowStore>,
    pub events: EventBus,
    pub executor: PipelineExecutor,
}

impl AppState {
    /// Wires the kernel to the store and provider and registers every
    /// feature listener on a fresh bus.
    pub fn new(
        config: GigConfig,
        store: Arc<dyn RowStore>,
        identity_provider: Arc<dyn IdentityProvider>,
    ) -> Self {
        let events = EventBus::new();
        register_listeners(&events, store.clone());

        let executor = PipelineExecutor::new(
            events.clone(),
            identity_provider,
            AuthorizationModel::new(store.clone()),
        )
        .with_max_body_bytes(config.common.max_body_bytes);

        Self {
            config,
            store,
            events,
            executor,
        }
    }
}

pub fn register_listeners(events: &EventBus, store: Arc<dyn RowStore>) {
    users::listeners::register(events, UserRepository::new(store.clone()));
    talents::listeners::register(events, TalentRepository::new(store));

    events.register::<AppUp, _, _>(|port: u16| async move {
        tracing::info!(port, "Server started successfully on port {}", port);
        Ok(None)
    });
    events.register::<RegistrationSuccessful, _, _>(|_| async {
        tracing::info!("Events listeners registered");
        Ok(None)
    });
}

pub fn build_router(state: AppState) -> Result<Router, AppError> {
    let executor = &state.executor;
    let users = UserRepository::new(state.store.clone());

    let app = Router::new()
        .route("/health", get(health_check))
        .with_state(state.clone())
        .merge(auth::routes(executor, users.clone())?)
        .merge(users::routes(executor, users)?)
        .merge(talents::routes(
            executor,
            TalentRepository::new(state.store.clone()),
        )?)
        .merge(gigs::routes(executor, GigRepository::new(state.store.clone()))?)
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(cors_layer(&state.config.security.allowed_origins));

    Ok(app)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::HeaderName::from_static(REQUEST_ID_HEADER),
        ])
}

pub async fn health_check(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    state.store.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Store health check failed");
        AppError::from(e)
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "store": "up"
        }
    })))
}
