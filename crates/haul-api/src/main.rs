//! # haul-api: Binary Entry Point
//!
//! Starts the Axum HTTP server for the load and trip lifecycle API.
//! Binds to `PORT` (default 8080).

use anyhow::Context;

use haul_api::state::{AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(?config, "configuration loaded");
    let port = config.port;

    // Absent DATABASE_URL means in-memory only.
    let db_pool = haul_api::db::init_pool()
        .await
        .context("database initialization failed")?;

    let state = AppState::with_config(config, db_pool);
    state
        .hydrate_from_db()
        .await
        .context("database hydration failed")?;

    let app = haul_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("haul API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
