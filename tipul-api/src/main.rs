//! # Tipul API Server
//!
//! REST API for therapists: clients, sessions, payments, recordings with
//! transcription and analysis, documents, tasks and notifications.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p tipul-api
//! ```

use tipul_api::app::{build_router, AppState};
use tipul_api::config::Config;
use tipul_shared::db::migrations::run_migrations;
use tipul_shared::db::pool::{create_pool, DatabaseConfig};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tipul_api=debug,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    tracing::info!("Tipul API Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    if config.cron_secret.is_none() {
        tracing::warn!("CRON_SECRET is not set; cron endpoints are open");
    }

    let db_config = DatabaseConfig::new(config.database.url.clone(), config.database.max_connections);
    let pool = create_pool(&db_config).await?;
    run_migrations(&pool).await?;

    let address = config.bind_address();
    let state = AppState::new(pool.clone(), config)?;
    let app = build_router(state);

    let listener = TcpListener::bind(&address).await?;
    tracing::info!("Server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Server stopped");
    Ok(())
}
