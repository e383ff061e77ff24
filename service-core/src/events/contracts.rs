//! Events the kernel itself dispatches. Services register the handlers.

use super::Event;
use crate::identity::Identity;

/// Resolves a local user record by id. The user module registers the
/// handler; the pipeline and the permission evaluator dispatch it.
pub struct UserGetById;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserLookup {
    pub id: String,
    /// Storage columns the caller needs; `None` loads the whole record.
    pub fields: Option<Vec<String>>,
}

impl UserLookup {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: None,
        }
    }

    pub fn with_fields(mut self, fields: &[&str]) -> Self {
        self.fields = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }
}

impl Event for UserGetById {
    const NAME: &'static str = "user:get-by-id";
    type Payload = UserLookup;
    type Output = Identity;
}
