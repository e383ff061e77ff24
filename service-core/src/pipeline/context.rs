use crate::error::AppError;
use crate::identity::Identity;
use crate::middleware::RequestId;
use axum::{
    body::{Body, Bytes},
    extract::{FromRequest, FromRequestParts, Multipart, Path, Query, Request},
    http::{HeaderMap, Method, Uri, header::CONTENT_TYPE, request::Parts},
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field_name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Everything a handler sees about one request. Built fresh per request
/// and owned by it.
#[derive(Debug)]
pub struct RequestContext {
    pub params: HashMap<String, String>,
    pub query: HashMap<String, String>,
    /// Parsed body. `{}` for an empty body, `null` when it could not be
    /// read or parsed.
    pub input: Value,
    pub files: Vec<UploadedFile>,
    pub identity: Option<Identity>,
    pub request_id: Option<String>,
    /// Merged into the final response before handler headers.
    pub response_headers: HeaderMap,
    parts: Parts,
}

impl RequestContext {
    /// Never fails: anything that cannot be read is left empty for the
    /// validators to judge.
    pub async fn from_request(req: Request, max_body_bytes: usize) -> Self {
        let (mut parts, body) = req.into_parts();

        let params = match Path::<HashMap<String, String>>::from_request_parts(&mut parts, &()).await {
            Ok(Path(params)) => params,
            Err(_) => HashMap::new(),
        };

        let query = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .map(|Query(q)| q)
            .unwrap_or_default();

        let request_id = parts.extensions.get::<RequestId>().map(|id| id.as_str().to_string());

        let content_type = parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let (input, files) = if content_type.starts_with("multipart/form-data") {
            read_multipart(&parts, body).await
        } else {
            (read_body(&content_type, body, max_body_bytes).await, Vec::new())
        };

        Self {
            params,
            query,
            input,
            files,
            identity: None,
            request_id,
            response_headers: HeaderMap::new(),
            parts,
        }
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    pub fn extensions(&self) -> &http::Extensions {
        &self.parts.extensions
    }

    pub(crate) fn extensions_mut(&mut self) -> &mut http::Extensions {
        &mut self.parts.extensions
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Path parameter that routing guarantees; absence is a client error.
    pub fn require_param(&self, name: &str) -> Result<&str, AppError> {
        self.param(name)
            .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Missing path parameter: {}", name)))
    }

    /// Typed view of the body. Call after a body schema has accepted it.
    pub fn input<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        T::deserialize(&self.input).map_err(|e| AppError::BadRequest(anyhow::anyhow!("Invalid request body: {}", e)))
    }

    pub fn query_as<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        let value = Value::Object(
            self.query
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        );
        T::deserialize(&value).map_err(|e| AppError::BadRequest(anyhow::anyhow!("Invalid query string: {}", e)))
    }

    /// The caller on a private route. Public routes have none.
    pub fn identity(&self) -> Result<&Identity, AppError> {
        self.identity
            .as_ref()
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("No authenticated user on request")))
    }

    pub fn file(&self, field_name: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|f| f.field_name == field_name)
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        let (parts, _) = Request::new(Body::empty()).into_parts();
        Self {
            params: HashMap::new(),
            query: HashMap::new(),
            input: Value::Object(Map::new()),
            files: Vec::new(),
            identity: None,
            request_id: None,
            response_headers: HeaderMap::new(),
            parts,
        }
    }
}

async fn read_body(content_type: &str, body: Body, limit: usize) -> Value {
    let bytes = match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, limit, "Failed to read request body");
            return Value::Null;
        }
    };

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Value::Object(Map::new());
    }

    if content_type.starts_with("application/x-www-form-urlencoded") {
        return match serde_urlencoded::from_bytes::<Vec<(String, String)>>(&bytes) {
            Ok(pairs) => Value::Object(
                pairs
                    .into_iter()
                    .map(|(k, v)| (k, Value::String(v)))
                    .collect(),
            ),
            Err(e) => {
                tracing::debug!(error = %e, "Unparseable form body");
                Value::Null
            }
        };
    }

    match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(error = %e, content_type, "Unparseable request body");
            Value::Null
        }
    }
}

/// Text fields land in the input object, file fields in the upload list.
async fn read_multipart(parts: &Parts, body: Body) -> (Value, Vec<UploadedFile>) {
    let req = Request::from_parts(parts.clone(), body);
    let mut multipart = match Multipart::from_request(req, &()).await {
        Ok(multipart) => multipart,
        Err(e) => {
            tracing::debug!(error = %e, "Unparseable multipart body");
            return (Value::Null, Vec::new());
        }
    };

    let mut input = Map::new();
    let mut files = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Stopped reading multipart body");
                break;
            }
        };

        let field_name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);

        match file_name {
            Some(file_name) => match field.bytes().await {
                Ok(data) => files.push(UploadedFile {
                    field_name,
                    file_name: Some(file_name),
                    content_type,
                    data,
                }),
                Err(e) => tracing::warn!(error = %e, field = %field_name, "Failed to read uploaded file"),
            },
            None => match field.text().await {
                Ok(text) => {
                    input.insert(field_name, Value::String(text));
                }
                Err(e) => tracing::warn!(error = %e, field = %field_name, "Failed to read form field"),
            },
        }
    }

    (Value::Object(input), files)
}
