//! Caller identity and the external identity-provider collaborator.

mod jwt;
mod remote;

pub use jwt::{JwtIdentityProvider, ProviderClaims};
pub use remote::RemoteIdentityProvider;

use crate::authz::Role;
use crate::error::AppError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// The authenticated caller, resolved at most once per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Absent until the user has picked a role.
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            role: None,
            attributes: Map::new(),
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }
}

/// User as known to the external identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Error)]
#[error("identity provider error (status {status:?}, code {code:?}): {message}")]
pub struct ProviderError {
    pub status: Option<u16>,
    pub code: Option<String>,
    pub message: String,
    pub retry_after: Option<u64>,
}

impl ProviderError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self {
            status: None,
            code: None,
            message: err.to_string(),
            retry_after: None,
        }
    }
}

/// Exchanges a bearer token for the provider's view of the user.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` when the token does not resolve to a user (expired,
    /// revoked, forged).
    async fn user_from_token(&self, token: &str) -> Result<Option<ExternalUser>, ProviderError>;
}

/// Classifies a provider failure. Rate-limit signals become 429 whatever
/// the provider calls them.
pub fn map_provider_error(err: &ProviderError, fallback: Option<&str>) -> AppError {
    if err.status == Some(429) || err.code.as_deref() == Some("over_email_send_rate_limit") {
        return AppError::TooManyRequests(
            "Too many requests. Please wait a few minutes before trying again.".to_string(),
            err.retry_after,
        );
    }

    if err.message == "Email not confirmed" {
        return AppError::Unauthorized(anyhow::anyhow!(
            "Please verify your email before logging in."
        ));
    }

    match err.status {
        Some(400) => AppError::BadRequest(anyhow::anyhow!(if err.message.is_empty() {
            "Invalid request".to_string()
        } else {
            err.message.clone()
        })),
        Some(409) => AppError::Conflict(anyhow::anyhow!("User already exists")),
        Some(401) => AppError::Unauthorized(anyhow::anyhow!("Invalid credentials")),
        None => AppError::InternalError(anyhow::anyhow!(
            "Identity provider unreachable: {}",
            err.message
        )),
        Some(status) if status >= 500 => AppError::InternalError(anyhow::anyhow!(
            "Identity provider failed with {}: {}",
            status,
            err.message
        )),
        Some(_) => AppError::Forbidden(anyhow::anyhow!(
            fallback.unwrap_or("Authentication failed").to_string()
        )),
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        map_provider_error(&err, None)
    }
}
