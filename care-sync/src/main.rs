//! care-sync service binary
//!
//! Serves the webhook receivers and admin API, and runs the auto sync loop.

use care_sync::error::BoxError;
use care_sync::{AppState, Config, api};

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "care_sync=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!("Starting care-sync (env: {})", config.environment);

    let state = AppState::new(&config)?;
    state.schedule_auto_sync(config.sync_interval_minutes).await;

    let app = api::create_router(state.clone());
    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("care-sync HTTP listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    // Stop the auto sync loop
    state.schedule_auto_sync(0).await;
    Ok(())
}
