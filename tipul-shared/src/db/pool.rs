/// PostgreSQL connection pool
///
/// # Example
///
/// ```no_run
/// use tipul_shared::db::pool::{create_pool, DatabaseConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig::new(std::env::var("DATABASE_URL")?, 10);
///     let pool = create_pool(&config).await?;
///
///     let (n,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
///         .fetch_one(&pool)
///         .await?;
///     println!("{n} therapists");
///     Ok(())
/// }
/// ```

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, info};

/// Pool settings; timeouts are in seconds so they map straight from env vars
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,

    pub max_connections: u32,

    /// Idle connections kept warm
    pub min_connections: u32,

    /// How long a request waits for a free connection
    pub acquire_timeout_seconds: u64,

    /// `None` keeps idle connections forever
    pub idle_timeout_seconds: Option<u64>,

    /// Forced recycling age
    pub max_lifetime_seconds: Option<u64>,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>, max_connections: u32) -> Self {
        Self {
            url: url.into(),
            max_connections,
            ..Default::default()
        }
    }

    fn options(&self) -> PgPoolOptions {
        let mut options = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections.min(self.max_connections))
            .acquire_timeout(Duration::from_secs(self.acquire_timeout_seconds));

        if let Some(idle) = self.idle_timeout_seconds {
            options = options.idle_timeout(Duration::from_secs(idle));
        }
        if let Some(lifetime) = self.max_lifetime_seconds {
            options = options.max_lifetime(Duration::from_secs(lifetime));
        }

        options
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_seconds: 30,
            idle_timeout_seconds: Some(600),
            max_lifetime_seconds: Some(1800),
        }
    }
}

/// Connects and verifies the database answers before returning
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Creating database connection pool"
    );

    let pool = config.options().connect(&config.url).await?;
    health_check(&pool).await?;

    info!("Database connection pool ready");
    Ok(pool)
}

/// Builds a pool without opening a connection
///
/// The first query connects. Used where the process must start even when
/// the database is briefly unavailable.
pub fn create_lazy_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    config.options().connect_lazy(&config.url)
}

/// `SELECT 1` round trip
pub async fn health_check(pool: &PgPool) -> Result<(), sqlx::Error> {
    debug!("Performing database health check");

    let (one,): (i32,) = sqlx::query_as("SELECT 1").fetch_one(pool).await?;
    if one != 1 {
        return Err(sqlx::Error::Protocol(format!(
            "Health check returned unexpected value {}",
            one
        )));
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub active_connections: usize,
    pub idle_connections: usize,
    pub total_connections: usize,
}

pub fn pool_stats(pool: &PgPool) -> PoolStats {
    let size = pool.size() as usize;
    let idle = pool.num_idle();

    PoolStats {
        active_connections: size.saturating_sub(idle),
        idle_connections: idle,
        total_connections: size,
    }
}

pub async fn close_pool(pool: PgPool) {
    info!("Closing database connection pool");
    pool.close().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_config_defaults() {
        let config = DatabaseConfig::new("postgres://localhost/tipul", 5);
        assert_eq!(config.url, "postgres://localhost/tipul");
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.min_connections, 1);
        assert_eq!(config.acquire_timeout_seconds, 30);
        assert_eq!(config.idle_timeout_seconds, Some(600));
    }

    #[tokio::test]
    async fn test_lazy_pool_does_not_connect() {
        let config = DatabaseConfig::new("postgres://nobody@127.0.0.1:1/none", 2);
        let pool = create_lazy_pool(&config).unwrap();

        let stats = pool_stats(&pool);
        assert_eq!(stats.total_connections, 0);
        assert_eq!(stats.active_connections, 0);
    }
}
