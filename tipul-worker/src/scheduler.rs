/// Periodic job scheduler
///
/// Runs the reminder job and the notification digest on fixed intervals
/// until its shutdown token is cancelled. Jobs run one at a time on the
/// scheduler's own task; a failed run is logged and retried on the next
/// tick.
///
/// The reminder job runs once at startup. The digest waits one full
/// interval so that restarting the process does not repeat it.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tipul_shared::scheduling::LocalClock;
/// use tipul_worker::mail::MemoryMailer;
/// use tipul_worker::scheduler::{Scheduler, SchedulerConfig};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> anyhow::Result<()> {
/// let scheduler = Scheduler::new(
///     pool,
///     Arc::new(MemoryMailer::new()),
///     LocalClock::utc(),
///     SchedulerConfig::default(),
/// );
///
/// let token = scheduler.shutdown_token();
/// tokio::spawn(async move {
///     let _ = tokio::signal::ctrl_c().await;
///     token.cancel();
/// });
///
/// scheduler.run().await?;
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use tipul_shared::scheduling::LocalClock;

use crate::config::WorkerConfig;
use crate::jobs;
use crate::mail::Mailer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub reminder_interval: Duration,
    pub digest_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            reminder_interval: Duration::from_secs(3600),
            digest_interval: Duration::from_secs(86_400),
        }
    }
}

impl From<&WorkerConfig> for SchedulerConfig {
    fn from(config: &WorkerConfig) -> Self {
        SchedulerConfig {
            reminder_interval: Duration::from_secs(config.reminder_interval_secs),
            digest_interval: Duration::from_secs(config.digest_interval_secs),
        }
    }
}

pub struct Scheduler {
    db: PgPool,
    mailer: Arc<dyn Mailer>,
    clock: LocalClock,
    config: SchedulerConfig,
    shutdown_token: CancellationToken,
}

impl Scheduler {
    pub fn new(db: PgPool, mailer: Arc<dyn Mailer>, clock: LocalClock, config: SchedulerConfig) -> Self {
        Scheduler {
            db,
            mailer,
            clock,
            config,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Token that stops [`Scheduler::run`] when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        tracing::info!(
            reminder_interval_secs = self.config.reminder_interval.as_secs(),
            digest_interval_secs = self.config.digest_interval.as_secs(),
            "Scheduler starting"
        );

        let start = Instant::now();
        let mut reminders = interval_at(start, self.config.reminder_interval);
        let mut digest = interval_at(start + self.config.digest_interval, self.config.digest_interval);
        reminders.set_missed_tick_behavior(MissedTickBehavior::Delay);
        digest.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_token.cancelled() => {
                    tracing::info!("Shutdown requested, scheduler stopping");
                    break;
                }
                _ = reminders.tick() => self.run_reminders().await,
                _ = digest.tick() => self.run_digest().await,
            }
        }

        tracing::info!("Scheduler shut down");
        Ok(())
    }

    async fn run_reminders(&self) {
        match jobs::run_reminders(&self.db, self.mailer.as_ref(), &self.clock, Utc::now()).await {
            Ok(report) if !report.errors.is_empty() => {
                tracing::warn!(errors = ?report.errors, "Reminder run finished with errors");
            }
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "Reminder run failed"),
        }
    }

    async fn run_digest(&self) {
        if let Err(e) = jobs::run_digest(&self.db, &self.clock, Utc::now()).await {
            tracing::error!(error = %e, "Digest run failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IntegrationsConfig;
    use crate::mail::MemoryMailer;
    use sqlx::postgres::PgPoolOptions;

    #[test]
    fn test_scheduler_config_default() {
        let config = SchedulerConfig::default();
        assert_eq!(config.reminder_interval, Duration::from_secs(3600));
        assert_eq!(config.digest_interval, Duration::from_secs(86_400));
    }

    #[test]
    fn test_scheduler_config_from_worker_config() {
        let worker = WorkerConfig {
            database_url: "postgres://localhost/tipul".to_string(),
            database_max_connections: 5,
            uploads_dir: "./uploads".to_string(),
            timezone_offset_minutes: 120,
            reminder_interval_secs: 60,
            digest_interval_secs: 600,
            integrations: IntegrationsConfig::default(),
        };

        let config = SchedulerConfig::from(&worker);
        assert_eq!(config.reminder_interval, Duration::from_secs(60));
        assert_eq!(config.digest_interval, Duration::from_secs(600));
    }

    #[tokio::test]
    async fn test_run_returns_when_already_cancelled() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/tipul_unused")
            .unwrap();
        let scheduler = Scheduler::new(
            pool,
            Arc::new(MemoryMailer::new()),
            LocalClock::utc(),
            SchedulerConfig::default(),
        );

        scheduler.shutdown_token().cancel();
        scheduler.run().await.unwrap();

        assert!(scheduler.shutdown_token().is_cancelled());
    }
}
