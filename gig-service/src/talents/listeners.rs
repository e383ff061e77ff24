use super::repository::TalentRepository;
use crate::events::{TalentCreate, TalentProfileByUser};
use serde_json::Value;
use service_core::events::EventBus;
use service_core::store::{Pagination, Row};

pub fn register(events: &EventBus, repository: TalentRepository) {
    {
        let repository = repository.clone();
        events.register::<TalentCreate, _, _>(move |user_id: String| {
            let repository = repository.clone();
            async move {
                let profile = repository.create_for_user(&user_id).await?;
                tracing::info!(user_id = %user_id, "Talent profile ready");
                Ok::<_, anyhow::Error>(Some(Value::Object(profile)))
            }
        });
    }

    events.register::<TalentProfileByUser, _, _>(move |user_id: String| {
        let repository = repository.clone();
        async move {
            let profile = profile_by_user(&repository, &user_id).await?;
            Ok::<_, anyhow::Error>(profile.map(Value::Object))
        }
    });
}

/// The profile with its average rating, latest review and portfolio items.
async fn profile_by_user(repository: &TalentRepository, user_id: &str) -> anyhow::Result<Option<Row>> {
    let Some(mut profile) = repository.find_by_user(user_id).await? else {
        return Ok(None);
    };
    let talent_id = match profile.get("id") {
        Some(Value::String(id)) => id.clone(),
        _ => anyhow::bail!("talent profile for user {user_id} has no id"),
    };

    let latest = repository
        .reviews(&talent_id, Pagination { page: 1, page_size: 1 })
        .await?;
    let summary = repository.rating_summary(&talent_id).await?;
    let portfolios = repository.portfolios(&talent_id).await?;

    profile.insert("averageRating".to_string(), summary.average_rating.into());
    profile.insert(
        "reviews".to_string(),
        Value::Array(latest.into_iter().map(Value::Object).collect()),
    );
    profile.insert(
        "portfolios".to_string(),
        Value::Array(portfolios.into_iter().map(Value::Object).collect()),
    );

    Ok(Some(profile))
}
