use super::{ExternalUser, IdentityProvider, ProviderError};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};

/// Claims carried by provider-issued access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderClaims {
    /// Subject (external user id)
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// Verifies HS256 access tokens signed with the provider's shared secret.
#[derive(Clone)]
pub struct JwtIdentityProvider {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    audience: Option<String>,
    token_expiry_minutes: i64,
}

impl JwtIdentityProvider {
    pub fn new(secret: &Secret<String>, audience: Option<String>, token_expiry_minutes: i64) -> Self {
        let secret = secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            audience,
            token_expiry_minutes,
        }
    }

    /// Issues a token the way the provider would; used by tooling and tests.
    pub fn issue_token(&self, user_id: &str, email: Option<&str>) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let exp = now + Duration::minutes(self.token_expiry_minutes);

        let claims = ProviderClaims {
            sub: user_id.to_string(),
            email: email.map(str::to_string),
            aud: self.audience.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode access token: {}", e))
    }

    pub fn validate(&self, token: &str) -> Result<ProviderClaims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        match &self.audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        decode::<ProviderClaims>(token, &self.decoding_key, &validation).map(|data| data.claims)
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn user_from_token(&self, token: &str) -> Result<Option<ExternalUser>, ProviderError> {
        match self.validate(token) {
            Ok(claims) => Ok(Some(ExternalUser {
                id: claims.sub,
                email: claims.email,
            })),
            Err(e) => {
                tracing::debug!(error = %e, "Rejected access token");
                Ok(None)
            }
        }
    }
}
