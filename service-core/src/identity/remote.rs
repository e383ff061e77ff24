use super::{ExternalUser, IdentityProvider, ProviderError};
use crate::error::AppError;
use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

/// Resolves tokens by asking the hosted identity provider for the user
/// behind them.
#[derive(Clone)]
pub struct RemoteIdentityProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Secret<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl RemoteIdentityProvider {
    pub fn new(base_url: &str, api_key: Secret<String>, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl IdentityProvider for RemoteIdentityProvider {
    async fn user_from_token(&self, token: &str) -> Result<Option<ExternalUser>, ProviderError> {
        let url = format!("{}/auth/v1/user", self.base_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .header("apikey", self.api_key.expose_secret())
            .send()
            .await
            .map_err(ProviderError::transport)?;

        let status = response.status();
        if status.is_success() {
            let user = response
                .json::<ExternalUser>()
                .await
                .map_err(ProviderError::transport)?;
            return Ok(Some(user));
        }

        if matches!(
            status,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
        ) {
            tracing::debug!(status = %status, "Identity provider did not recognise token");
            return Ok(None);
        }

        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        let body: ErrorBody = response.json().await.unwrap_or_default();
        let code = body.error_code.or_else(|| match body.code {
            Some(serde_json::Value::String(code)) => Some(code),
            _ => None,
        });

        tracing::warn!(status = %status, code = ?code, "Identity provider request failed");

        Err(ProviderError {
            status: Some(status.as_u16()),
            code,
            message: body
                .msg
                .or(body.message)
                .unwrap_or_else(|| status.to_string()),
            retry_after,
        })
    }
}
