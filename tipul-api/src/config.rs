/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `CORS_ORIGINS`: comma-separated allowed origins (default: *)
/// - `PRODUCTION`: enables HSTS (default: false)
/// - `JWT_SECRET`: Secret key for JWT signing (required, at least 32 characters)
/// - `CRON_SECRET`: bearer secret for the cron endpoints (optional)
/// - `UPLOADS_DIR`: uploads root (default: ./uploads)
/// - `TIMEZONE_OFFSET_MINUTES`: practice's offset from UTC (default: 0)
/// - AI and e-mail keys, see [`IntegrationsConfig`]
///
/// # Example
///
/// ```no_run
/// use tipul_api::config::Config;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}:{}", config.api.host, config.api.port);
/// # Ok(())
/// # }
/// ```

use std::env;

use tipul_shared::scheduling::LocalClock;
use tipul_worker::config::{optional_var, parsed_var, IntegrationsConfig};

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,

    /// Bearer secret of the cron endpoints; unset leaves them open
    pub cron_secret: Option<String>,

    pub uploads_dir: String,

    /// Offset of the practice's local time from UTC, in minutes
    pub timezone_offset_minutes: i32,

    pub integrations: IntegrationsConfig,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Production mode turns on HSTS
    pub production: bool,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// Must be at least 32 characters. Generate with: `openssl rand -hex 32`
    pub secret: String,
}

impl Config {
    /// Loads `.env` if present, then reads the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `DATABASE_URL` or `JWT_SECRET` is missing
    /// - `JWT_SECRET` is shorter than 32 characters
    /// - a numeric or boolean variable cannot be parsed
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = optional_var(&lookup, "DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let jwt_secret = optional_var(&lookup, "JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let timezone_offset_minutes = parsed_var(&lookup, "TIMEZONE_OFFSET_MINUTES", 0i32)?;
        if timezone_offset_minutes.abs() > 14 * 60 {
            anyhow::bail!("TIMEZONE_OFFSET_MINUTES must be between -840 and 840");
        }

        let cors_origins = optional_var(&lookup, "CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        Ok(Self {
            api: ApiConfig {
                host: optional_var(&lookup, "API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parsed_var(&lookup, "API_PORT", 8080u16)?,
                cors_origins,
                production: parsed_var(&lookup, "PRODUCTION", false)?,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: parsed_var(&lookup, "DATABASE_MAX_CONNECTIONS", 10u32)?,
            },
            jwt: JwtConfig { secret: jwt_secret },
            cron_secret: optional_var(&lookup, "CRON_SECRET"),
            uploads_dir: optional_var(&lookup, "UPLOADS_DIR").unwrap_or_else(|| "./uploads".to_string()),
            timezone_offset_minutes,
            integrations: IntegrationsConfig::from_lookup(&lookup),
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Clock for the configured local offset
    pub fn clock(&self) -> LocalClock {
        LocalClock::from_offset_minutes(self.timezone_offset_minutes).unwrap_or_else(LocalClock::utc)
    }
}
