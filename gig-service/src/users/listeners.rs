use super::repository::UserRepository;
use service_core::authz::Role;
use service_core::events::{EventBus, UserGetById, UserLookup};
use service_core::identity::Identity;
use service_core::store::Row;
use serde_json::Value;

/// Answers `user:get-by-id` for the pipeline and the permission evaluator.
pub fn register(events: &EventBus, repository: UserRepository) {
    events.register::<UserGetById, _, _>(move |lookup: UserLookup| {
        let repository = repository.clone();
        async move {
            let columns: Option<Vec<&str>> = lookup
                .fields
                .as_ref()
                .map(|fields| fields.iter().map(String::as_str).collect());
            let row = repository
                .find_by_id(&lookup.id, columns.as_deref())
                .await?;
            Ok::<_, anyhow::Error>(row.map(|row| identity_from_row(&lookup.id, row)))
        }
    });
}

/// A stored role the enum does not know is treated as no role at all.
fn identity_from_row(id: &str, mut row: Row) -> Identity {
    row.remove("id");

    let role = match row.remove("role") {
        Some(Value::String(raw)) => match raw.parse::<Role>() {
            Ok(role) => Some(role),
            Err(e) => {
                tracing::warn!(user_id = id, error = %e, "Ignoring unrecognised stored role");
                None
            }
        },
        _ => None,
    };

    let email = match row.remove("email") {
        Some(Value::String(email)) => Some(email),
        _ => None,
    };

    Identity {
        id: id.to_string(),
        email,
        role,
        attributes: row,
    }
}
