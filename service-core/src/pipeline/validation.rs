//! Request schemas for the body, query string and path parameters.

use super::context::RequestContext;
use crate::error::AppError;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use validator::{Validate, ValidationErrors};

/// Checks one section of a request. The error string is shown to the
/// client after sanitizing.
pub trait Schema: Send + Sync {
    fn check(&self, value: &Value) -> Result<(), String>;
}

/// Schema backed by a DTO: the section must deserialize into `T` and pass
/// its `validator` rules.
pub struct Validated<T>(PhantomData<fn() -> T>);

impl<T> Validated<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Validated<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Schema for Validated<T>
where
    T: DeserializeOwned + Validate,
{
    fn check(&self, value: &Value) -> Result<(), String> {
        let parsed = T::deserialize(value).map_err(|e| e.to_string())?;
        parsed.validate().map_err(|e| first_violation(&e))
    }
}

/// Deterministic single message out of a validator report: the
/// alphabetically first failing field wins.
fn first_violation(errors: &ValidationErrors) -> String {
    let mut fields: Vec<(String, String)> = errors
        .field_errors()
        .into_iter()
        .filter_map(|(field, errs)| {
            let field = field.to_string();
            errs.first().map(|err| {
                let message = match &err.message {
                    Some(message) => message.to_string(),
                    None => format!("{} is invalid ({})", field, err.code),
                };
                (field, message)
            })
        })
        .collect();
    fields.sort();

    fields
        .into_iter()
        .next()
        .map(|(_, message)| message)
        .unwrap_or_else(|| errors.to_string())
}

/// Quote characters from schema-library formatting never reach clients.
pub fn sanitize_message(message: &str) -> String {
    message.replace(['"', '`'], "").trim().to_string()
}

#[derive(Clone, Default)]
pub struct ValidationSchema {
    body: Option<Arc<dyn Schema>>,
    query: Option<Arc<dyn Schema>>,
    path: Option<Arc<dyn Schema>>,
}

impl ValidationSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body<T: DeserializeOwned + Validate + 'static>(self) -> Self {
        self.body_schema(Validated::<T>::new())
    }

    pub fn query<T: DeserializeOwned + Validate + 'static>(self) -> Self {
        self.query_schema(Validated::<T>::new())
    }

    pub fn path<T: DeserializeOwned + Validate + 'static>(self) -> Self {
        self.path_schema(Validated::<T>::new())
    }

    pub fn body_schema(mut self, schema: impl Schema + 'static) -> Self {
        self.body = Some(Arc::new(schema));
        self
    }

    pub fn query_schema(mut self, schema: impl Schema + 'static) -> Self {
        self.query = Some(Arc::new(schema));
        self
    }

    pub fn path_schema(mut self, schema: impl Schema + 'static) -> Self {
        self.path = Some(Arc::new(schema));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_none() && self.query.is_none() && self.path.is_none()
    }

    /// Body first, then query, then path. The first violation ends the
    /// check.
    pub fn validate(&self, ctx: &RequestContext) -> Result<(), AppError> {
        let failed = |message: String| AppError::Unprocessable(sanitize_message(&message));

        if let Some(schema) = &self.body {
            schema.check(&ctx.input).map_err(failed)?;
        }
        if let Some(schema) = &self.query {
            schema.check(&string_map(&ctx.query)).map_err(failed)?;
        }
        if let Some(schema) = &self.path {
            schema.check(&string_map(&ctx.params)).map_err(failed)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for ValidationSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationSchema")
            .field("body", &self.body.is_some())
            .field("query", &self.query.is_some())
            .field("path", &self.path.is_some())
            .finish()
    }
}

fn string_map(values: &HashMap<String, String>) -> Value {
    Value::Object(
        values
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect::<Map<_, _>>(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, Validate)]
    #[serde(rename_all = "camelCase")]
    struct CreateThing {
        #[validate(length(min = 3, message = "\"name\" length must be at least 3 characters long"))]
        name: String,
        #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
        rating: Option<u8>,
    }

    fn ctx_with_input(input: Value) -> RequestContext {
        let mut ctx = RequestContext::for_tests();
        ctx.input = input;
        ctx
    }

    fn unprocessable(result: Result<(), AppError>) -> String {
        match result {
            Err(AppError::Unprocessable(msg)) => msg,
            other => panic!("expected unprocessable, got {other:?}"),
        }
    }

    #[test]
    fn empty_schema_accepts_anything() {
        let schema = ValidationSchema::new();
        assert!(schema.is_empty());
        assert!(schema.validate(&ctx_with_input(Value::Null)).is_ok());
    }

    #[test]
    fn violations_are_sanitized() {
        let schema = ValidationSchema::new().body::<CreateThing>();
        let msg = unprocessable(schema.validate(&ctx_with_input(json!({"name": "ab"}))));
        assert_eq!(msg, "name length must be at least 3 characters long");
    }

    #[test]
    fn shape_errors_lose_their_backticks() {
        let schema = ValidationSchema::new().body::<CreateThing>();
        let msg = unprocessable(schema.validate(&ctx_with_input(json!({"rating": 2}))));
        assert_eq!(msg, "missing field name");
    }

    #[test]
    fn range_rules_apply() {
        let schema = ValidationSchema::new().body::<CreateThing>();
        let msg = unprocessable(schema.validate(&ctx_with_input(json!({"name": "abc", "rating": 9}))));
        assert_eq!(msg, "Rating must be between 1 and 5");
    }

    #[test]
    fn path_values_are_checked_as_strings() {
        #[derive(Deserialize, Validate)]
        struct IdPath {
            #[validate(length(equal = 2, message = "bad id"))]
            id: String,
        }

        let schema = ValidationSchema::new().path::<IdPath>();
        let mut ctx = RequestContext::for_tests();
        ctx.params.insert("id".to_string(), "r1".to_string());
        assert!(schema.validate(&ctx).is_ok());

        ctx.params.insert("id".to_string(), "r10".to_string());
        assert_eq!(unprocessable(schema.validate(&ctx)), "bad id");
    }
}
