//! Postgres bootstrap for the gig marketplace: pool, migrations and a
//! schema check covering every table the feature repositories read.

use crate::config::DatabaseConfig;
use crate::gigs::repository::GIGS_TABLE;
use crate::talents::repository::{PORTFOLIOS_TABLE, REVIEWS_TABLE, TALENTS_TABLE};
use crate::users::USERS_TABLE;
use service_core::authz::ROLE_PERMISSIONS_TABLE;
use service_core::error::AppError;
use service_core::store::PgRowStore;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

pub const PAYMENTS_TABLE: &str = "payments";

/// Tables the service cannot start without. `payments` backs ownership
/// checks on the payment resource type.
pub const REQUIRED_TABLES: [&str; 7] = [
    USERS_TABLE,
    ROLE_PERMISSIONS_TABLE,
    TALENTS_TABLE,
    PORTFOLIOS_TABLE,
    REVIEWS_TABLE,
    GIGS_TABLE,
    PAYMENTS_TABLE,
];

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Connecting to PostgreSQL"
    );

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&config.url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Gig schema migrations applied");
    Ok(())
}

pub async fn health_check(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Names from [`REQUIRED_TABLES`] absent from the current schema.
pub async fn missing_tables(pool: &PgPool) -> Result<Vec<&'static str>, sqlx::Error> {
    let present: Vec<String> = sqlx::query_scalar(
        "SELECT table_name::text FROM information_schema.tables \
         WHERE table_schema = current_schema() AND table_name = ANY($1)",
    )
    .bind(&REQUIRED_TABLES[..])
    .fetch_all(pool)
    .await?;

    Ok(absent_from(&present))
}

fn absent_from(present: &[String]) -> Vec<&'static str> {
    REQUIRED_TABLES
        .into_iter()
        .filter(|table| !present.iter().any(|p| p == table))
        .collect()
}

/// Connects, migrates and verifies the schema, then wraps the pool as the
/// service's row store.
pub async fn connect_store(config: &DatabaseConfig) -> Result<PgRowStore, AppError> {
    let db_error = |e: sqlx::Error| AppError::DatabaseError(anyhow::Error::new(e));

    let pool = create_pool(config).await.map_err(db_error)?;
    run_migrations(&pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;
    health_check(&pool).await.map_err(db_error)?;

    let missing = missing_tables(&pool).await.map_err(db_error)?;
    if !missing.is_empty() {
        return Err(AppError::DatabaseError(anyhow::anyhow!(
            "schema is missing tables: {}",
            missing.join(", ")
        )));
    }

    Ok(PgRowStore::new(pool))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_only_the_tables_not_present() {
        let present: Vec<String> = ["users", "gigs", "talent_profiles", "payments"]
            .iter()
            .map(|t| t.to_string())
            .collect();

        assert_eq!(
            absent_from(&present),
            vec!["role_permissions", "talent_portfolios", "talent_reviews"]
        );
        let all: Vec<String> = REQUIRED_TABLES.iter().map(|t| t.to_string()).collect();
        assert!(absent_from(&all).is_empty());
    }

    #[tokio::test]
    #[ignore] // Requires running PostgreSQL
    async fn migrations_create_every_required_table() {
        let config = DatabaseConfig {
            url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/gigs_test".to_string()),
            max_connections: 5,
            min_connections: 1,
        };

        let pool = create_pool(&config).await.unwrap();
        run_migrations(&pool).await.unwrap();

        assert!(missing_tables(&pool).await.unwrap().is_empty());
        assert!(connect_store(&config).await.is_ok());
    }
}
