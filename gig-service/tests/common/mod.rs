#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use gig_service::{
    build_router,
    config::{AuthProviderConfig, Environment, GigConfig, SecurityConfig},
    AppState,
};
use secrecy::Secret;
use serde_json::{json, Value};
use service_core::config::Config;
use service_core::identity::JwtIdentityProvider;
use service_core::store::MemoryStore;
use std::sync::Arc;
use tower::util::ServiceExt;

pub const EMPLOYER_ID: &str = "0b8a6f0e-3c55-4f5e-9a51-3f1f8d2b7c01";
pub const TALENT_ID: &str = "1c9b7a1f-4d66-4a6f-8b62-4a2a9e3c8d02";
pub const ADMIN_ID: &str = "2dac8b2a-5e77-4b7a-9c73-5b3baf4d9e03";
pub const NEWCOMER_ID: &str = "3ebd9c3b-6f88-4c8b-8d84-6c4cba5eaf04";
pub const OTHER_EMPLOYER_ID: &str = "4fce0d4c-7a99-4d9c-9e95-7d5dcb6fba05";

pub const TALENT_PROFILE_ID: &str = "5adf1e5d-8baa-4ead-8fa6-8e6edc7acb06";
pub const GIG_ID: &str = "6be02f6e-9cbb-4fbe-a0b7-9f7fed8bdc07";

const TEST_SECRET: &str = "integration-test-secret";

pub struct TestApp {
    pub router: Router,
    pub store: MemoryStore,
    pub state: AppState,
    tokens: JwtIdentityProvider,
}

pub fn test_config() -> GigConfig {
    GigConfig {
        common: Config::default(),
        environment: Environment::Dev,
        service_name: "gig-service".to_string(),
        service_version: "test".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        database: None,
        auth: AuthProviderConfig {
            jwt_secret: Secret::new(TEST_SECRET.to_string()),
            jwt_audience: Some("authenticated".to_string()),
            token_expiry_minutes: 15,
            provider_url: None,
            provider_api_key: None,
            provider_timeout_seconds: 5,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
    }
}

async fn seed(store: &MemoryStore) {
    store
        .seed(
            "users",
            vec![
                json!({"id": EMPLOYER_ID, "email": "employer@example.com", "first_name": "Erin", "role": "employer", "created_at": "2024-01-01T00:00:00Z"}),
                json!({"id": TALENT_ID, "email": "talent@example.com", "first_name": "Tara", "role": "talent", "created_at": "2024-01-02T00:00:00Z"}),
                json!({"id": ADMIN_ID, "email": "admin@example.com", "first_name": "Alex", "role": "admin", "created_at": "2024-01-03T00:00:00Z"}),
                json!({"id": NEWCOMER_ID, "email": "new@example.com", "first_name": "Noa", "role": null, "created_at": "2024-01-04T00:00:00Z"}),
                json!({"id": OTHER_EMPLOYER_ID, "email": "other@example.com", "first_name": "Olu", "role": "employer", "created_at": "2024-01-05T00:00:00Z"}),
            ],
        )
        .await;
    store
        .seed(
            "talent_profiles",
            vec![json!({"id": TALENT_PROFILE_ID, "user_id": TALENT_ID, "stage_name": "DJ Tara", "skills": ["dj"]})],
        )
        .await;
    store
        .seed(
            "gigs",
            vec![json!({"id": GIG_ID, "employer_id": EMPLOYER_ID, "title": "Wedding DJ", "status": "open"})],
        )
        .await;
}

impl TestApp {
    pub async fn spawn() -> Self {
        let config = test_config();
        let store = MemoryStore::new();
        seed(&store).await;

        let tokens = JwtIdentityProvider::new(
            &config.auth.jwt_secret,
            config.auth.jwt_audience.clone(),
            config.auth.token_expiry_minutes,
        );
        let state = AppState::new(config, Arc::new(store.clone()), Arc::new(tokens.clone()));
        let router = build_router(state.clone()).expect("router builds");

        Self {
            router,
            store,
            state,
            tokens,
        }
    }

    pub fn token_for(&self, user_id: &str) -> String {
        self.tokens.issue_token(user_id, None).expect("token issues")
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        user_id: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user_id) = user_id {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", self.token_for(user_id)));
        }
        let body = match body {
            Some(body) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }
}
