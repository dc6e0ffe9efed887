//! # Tipul Worker
//!
//! Scheduler process for the notification batch jobs. Sends the 48-hour
//! session reminders and writes the daily notification digest.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p tipul-worker
//! ```

use std::sync::Arc;

use tipul_shared::db::migrations::run_migrations;
use tipul_shared::db::pool::{create_pool, DatabaseConfig};
use tipul_shared::scheduling::LocalClock;
use tipul_worker::config::WorkerConfig;
use tipul_worker::mail::ResendMailer;
use tipul_worker::scheduler::{Scheduler, SchedulerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tipul_worker=debug".into());

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

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    tracing::info!("Tipul Worker v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = WorkerConfig::from_env()?;
    let clock = LocalClock::from_offset_minutes(config.timezone_offset_minutes)
        .ok_or_else(|| anyhow::anyhow!("Invalid TIMEZONE_OFFSET_MINUTES"))?;

    let db_config = DatabaseConfig::new(config.database_url.clone(), config.database_max_connections);
    let pool = create_pool(&db_config).await?;
    run_migrations(&pool).await?;

    let mailer = ResendMailer::from_config(&config.integrations)?;
    if !mailer.is_configured() {
        tracing::warn!("RESEND_API_KEY is not set; session reminders will fail to send");
    }

    let scheduler = Scheduler::new(pool.clone(), Arc::new(mailer), clock, SchedulerConfig::from(&config));

    let token = scheduler.shutdown_token();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
        tracing::info!("Shutdown signal received");
        token.cancel();
    });

    scheduler.run().await?;
    pool.close().await;

    tracing::info!("Worker stopped");
    Ok(())
}
