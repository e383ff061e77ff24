use crate::error::AppError;
use axum::{
    Json,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;

/// What a route handler hands back to the pipeline. Shaped into
/// `{message, data?}`; 204 carries no body at all.
#[derive(Debug, Clone)]
pub struct HandlerResponse {
    pub status: StatusCode,
    pub message: String,
    pub data: Option<Value>,
    pub headers: HeaderMap,
}

impl HandlerResponse {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            data: None,
            headers: HeaderMap::new(),
        }
    }

    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, message)
    }

    pub fn created(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CREATED, message)
    }

    pub fn no_content() -> Self {
        Self::new(StatusCode::NO_CONTENT, "")
    }

    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn try_with_data<T: Serialize>(self, data: &T) -> Result<Self, AppError> {
        let value = serde_json::to_value(data)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("Failed to serialize response: {}", e)))?;
        Ok(self.with_data(value))
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a Value>,
}

impl IntoResponse for HandlerResponse {
    fn into_response(self) -> Response {
        if self.status == StatusCode::NO_CONTENT {
            return (self.status, self.headers).into_response();
        }

        let envelope = Envelope {
            message: &self.message,
            data: self.data.as_ref(),
        };
        (self.status, self.headers.clone(), Json(envelope)).into_response()
    }
}
