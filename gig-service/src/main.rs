use gig_service::{
    build_router,
    config::GigConfig,
    db,
    events::{AppUp, RegistrationSuccessful},
    AppState,
};
use service_core::error::AppError;
use service_core::identity::{IdentityProvider, JwtIdentityProvider, RemoteIdentityProvider};
use service_core::observability::init_tracing;
use service_core::store::{MemoryStore, RowStore};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load configuration - fail fast if invalid
    let config = GigConfig::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    )?;

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting gig service"
    );

    let store: Arc<dyn RowStore> = match &config.database {
        Some(database) => Arc::new(db::connect_store(database).await?),
        None => {
            tracing::warn!("DATABASE_URL not set - using the in-memory store, data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let identity_provider: Arc<dyn IdentityProvider> = match (
        &config.auth.provider_url,
        &config.auth.provider_api_key,
    ) {
        (Some(url), Some(api_key)) => {
            tracing::info!(provider = %url, "Resolving tokens through the identity provider");
            Arc::new(RemoteIdentityProvider::new(
                url,
                api_key.clone(),
                Duration::from_secs(config.auth.provider_timeout_seconds),
            )?)
        }
        _ => {
            tracing::info!("Verifying tokens locally");
            Arc::new(JwtIdentityProvider::new(
                &config.auth.jwt_secret,
                config.auth.jwt_audience.clone(),
                config.auth.token_expiry_minutes,
            ))
        }
    };

    let state = AppState::new(config.clone(), store, identity_provider);
    state.events.dispatch::<RegistrationSuccessful>(()).await?;

    let events = state.events.clone();
    let app = build_router(state)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));

    let service_span = tracing::info_span!(
        "service",
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
    );
    let _guard = service_span.enter();

    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    events.dispatch::<AppUp>(addr.port()).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
