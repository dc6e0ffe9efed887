/// Schema migrations
///
/// SQL files live in `migrations/` at the workspace root and are embedded at
/// compile time, so the binaries carry their schema with them.
///
/// # Example
///
/// ```no_run
/// use tipul_shared::db::pool::{create_pool, DatabaseConfig};
/// use tipul_shared::db::migrations::{run_migrations, migration_status};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(&DatabaseConfig::new(std::env::var("DATABASE_URL")?, 5)).await?;
/// run_migrations(&pool).await?;
///
/// let status = migration_status(&pool).await?;
/// println!("Applied {} of {}", status.applied_migrations, status.known_migrations);
/// # Ok(())
/// # }
/// ```

use sqlx::{migrate::MigrateDatabase, migrate::Migrator, postgres::PgPool, Postgres};
use tracing::{debug, info, warn};

pub static MIGRATOR: Migrator = sqlx::migrate!("../migrations");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub applied_migrations: usize,

    /// Migrations embedded in this binary
    pub known_migrations: usize,

    pub latest_version: Option<i64>,
}

impl MigrationStatus {
    pub fn is_up_to_date(&self) -> bool {
        self.applied_migrations >= self.known_migrations
    }
}

/// Applies every pending migration
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Running database migrations");

    MIGRATOR.run(pool).await.map_err(|e| {
        warn!(error = %e, "Migration failed");
        e
    })?;

    info!("Database schema is up to date");
    Ok(())
}

/// Compares the applied set with the embedded set
pub async fn migration_status(pool: &PgPool) -> Result<MigrationStatus, sqlx::Error> {
    let known_migrations = MIGRATOR.iter().filter(|m| !m.migration_type.is_down_migration()).count();

    let table_exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (
            SELECT FROM information_schema.tables
            WHERE table_schema = 'public' AND table_name = '_sqlx_migrations'
        )",
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        debug!("Migrations table does not exist yet");
        return Ok(MigrationStatus {
            applied_migrations: 0,
            known_migrations,
            latest_version: None,
        });
    }

    let (count, latest_version): (i64, Option<i64>) = sqlx::query_as(
        "SELECT COUNT(*), MAX(version) FROM _sqlx_migrations WHERE success = true",
    )
    .fetch_one(pool)
    .await?;

    Ok(MigrationStatus {
        applied_migrations: count as usize,
        known_migrations,
        latest_version,
    })
}

/// Creates the database named in `database_url` if it is missing
pub async fn ensure_database_exists(database_url: &str) -> Result<(), sqlx::Error> {
    if !Postgres::database_exists(database_url).await? {
        info!("Database does not exist, creating it");
        Postgres::create_database(database_url).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_schema_is_embedded() {
        assert!(MIGRATOR.iter().any(|m| m.description.contains("initial schema")));
    }

    #[test]
    fn test_up_to_date() {
        let status = MigrationStatus {
            applied_migrations: 1,
            known_migrations: 1,
            latest_version: Some(20250101000001),
        };
        assert!(status.is_up_to_date());

        let behind = MigrationStatus {
            applied_migrations: 0,
            ..status
        };
        assert!(!behind.is_up_to_date());
    }
}
