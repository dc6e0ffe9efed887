/// Worker and integration configuration
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required by the worker binary)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `UPLOADS_DIR`: uploads root (default: ./uploads)
/// - `TIMEZONE_OFFSET_MINUTES`: local offset from UTC (default: 0)
/// - `REMINDER_INTERVAL_SECS`: reminder job period (default: 3600)
/// - `DIGEST_INTERVAL_SECS`: digest job period (default: 86400)
/// - `GOOGLE_AI_API_KEY`, `GEMINI_MODEL`, `TRANSCRIPTION_LANGUAGE`
/// - `ANTHROPIC_API_KEY`, `ANTHROPIC_MODEL`
/// - `RESEND_API_KEY`, `EMAIL_FROM`
/// - `GEMINI_BASE_URL`, `ANTHROPIC_BASE_URL`, `RESEND_BASE_URL`: provider
///   endpoints, for proxies and local fakes (default: the public APIs)
///
/// Missing API keys are not an error here; the integration reports "not
/// configured" when it is first used.

use anyhow::Context;
use std::env;
use std::str::FromStr;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_TRANSCRIPTION_LANGUAGE: &str = "he";
pub const DEFAULT_EMAIL_FROM: &str = "Tipul <noreply@tipul.app>";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_RESEND_BASE_URL: &str = "https://api.resend.com";

/// Reads an optional variable, treating blank values as unset
pub fn optional_var(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Parses a variable, falling back to `default` when it is unset
pub fn parsed_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_var(lookup, key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{} has an invalid value: {:?}", key, raw)),
        None => Ok(default),
    }
}

/// Outbound AI and e-mail settings
#[derive(Debug, Clone)]
pub struct IntegrationsConfig {
    pub google_ai_api_key: Option<String>,
    pub gemini_model: String,

    /// ISO 639-1 code of the language spoken in recordings
    pub transcription_language: String,

    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,

    pub resend_api_key: Option<String>,
    pub email_from: String,

    pub gemini_base_url: String,
    pub anthropic_base_url: String,
    pub resend_base_url: String,
}

impl Default for IntegrationsConfig {
    fn default() -> Self {
        Self {
            google_ai_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            transcription_language: DEFAULT_TRANSCRIPTION_LANGUAGE.to_string(),
            anthropic_api_key: None,
            anthropic_model: DEFAULT_ANTHROPIC_MODEL.to_string(),
            resend_api_key: None,
            email_from: DEFAULT_EMAIL_FROM.to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            anthropic_base_url: DEFAULT_ANTHROPIC_BASE_URL.to_string(),
            resend_base_url: DEFAULT_RESEND_BASE_URL.to_string(),
        }
    }
}

impl IntegrationsConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            google_ai_api_key: optional_var(&lookup, "GOOGLE_AI_API_KEY"),
            gemini_model: optional_var(&lookup, "GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            transcription_language: optional_var(&lookup, "TRANSCRIPTION_LANGUAGE")
                .unwrap_or(defaults.transcription_language),
            anthropic_api_key: optional_var(&lookup, "ANTHROPIC_API_KEY"),
            anthropic_model: optional_var(&lookup, "ANTHROPIC_MODEL")
                .unwrap_or(defaults.anthropic_model),
            resend_api_key: optional_var(&lookup, "RESEND_API_KEY"),
            email_from: optional_var(&lookup, "EMAIL_FROM").unwrap_or(defaults.email_from),
            gemini_base_url: optional_var(&lookup, "GEMINI_BASE_URL")
                .unwrap_or(defaults.gemini_base_url),
            anthropic_base_url: optional_var(&lookup, "ANTHROPIC_BASE_URL")
                .unwrap_or(defaults.anthropic_base_url),
            resend_base_url: optional_var(&lookup, "RESEND_BASE_URL")
                .unwrap_or(defaults.resend_base_url),
        }
    }
}

/// Settings of the scheduler binary
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub uploads_dir: String,
    pub timezone_offset_minutes: i32,
    pub reminder_interval_secs: u64,
    pub digest_interval_secs: u64,
    pub integrations: IntegrationsConfig,
}

impl WorkerConfig {
    /// Loads `.env` if present, then reads the process environment
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = optional_var(&lookup, "DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let timezone_offset_minutes = parsed_var(&lookup, "TIMEZONE_OFFSET_MINUTES", 0i32)?;
        if timezone_offset_minutes.abs() > 14 * 60 {
            anyhow::bail!("TIMEZONE_OFFSET_MINUTES must be between -840 and 840");
        }

        let reminder_interval_secs = parsed_var(&lookup, "REMINDER_INTERVAL_SECS", 3600u64)?;
        let digest_interval_secs = parsed_var(&lookup, "DIGEST_INTERVAL_SECS", 86_400u64)?;
        if reminder_interval_secs == 0 || digest_interval_secs == 0 {
            anyhow::bail!("Job intervals must be greater than zero");
        }

        Ok(Self {
            database_url,
            database_max_connections: parsed_var(&lookup, "DATABASE_MAX_CONNECTIONS", 10u32)?,
            uploads_dir: optional_var(&lookup, "UPLOADS_DIR").unwrap_or_else(|| "./uploads".to_string()),
            timezone_offset_minutes,
            reminder_interval_secs,
            digest_interval_secs,
            integrations: IntegrationsConfig::from_lookup(&lookup),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_integration_defaults() {
        let config = IntegrationsConfig::from_lookup(lookup(&[("GOOGLE_AI_API_KEY", "  ")]));

        assert_eq!(config.google_ai_api_key, None);
        assert_eq!(config.gemini_model, "gemini-2.0-flash");
        assert_eq!(config.transcription_language, "he");
        assert_eq!(config.anthropic_model, "claude-sonnet-4-20250514");
        assert_eq!(config.email_from, "Tipul <noreply@tipul.app>");
        assert_eq!(config.anthropic_base_url, "https://api.anthropic.com");
    }

    #[test]
    fn test_provider_endpoints_can_be_overridden() {
        let config = IntegrationsConfig::from_lookup(lookup(&[
            ("GEMINI_BASE_URL", "http://localhost:9999"),
            ("RESEND_BASE_URL", "http://localhost:8025/"),
        ]));

        assert_eq!(config.gemini_base_url, "http://localhost:9999");
        assert_eq!(config.resend_base_url, "http://localhost:8025/");
        assert_eq!(config.anthropic_base_url, DEFAULT_ANTHROPIC_BASE_URL);
    }

    #[test]
    fn test_worker_config_requires_database_url() {
        assert!(WorkerConfig::from_lookup(lookup(&[])).is_err());
    }

    #[test]
    fn test_worker_config_parses_values() {
        let config = WorkerConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgresql://localhost/tipul"),
            ("TIMEZONE_OFFSET_MINUTES", "120"),
            ("REMINDER_INTERVAL_SECS", "600"),
            ("RESEND_API_KEY", "re_123"),
        ]))
        .unwrap();

        assert_eq!(config.timezone_offset_minutes, 120);
        assert_eq!(config.reminder_interval_secs, 600);
        assert_eq!(config.digest_interval_secs, 86_400);
        assert_eq!(config.uploads_dir, "./uploads");
        assert_eq!(config.integrations.resend_api_key.as_deref(), Some("re_123"));
    }

    #[test]
    fn test_worker_config_rejects_bad_numbers() {
        let bad_offset = WorkerConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgresql://localhost/tipul"),
            ("TIMEZONE_OFFSET_MINUTES", "two hours"),
        ]));
        assert!(bad_offset.is_err());

        let zero_interval = WorkerConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgresql://localhost/tipul"),
            ("DIGEST_INTERVAL_SECS", "0"),
        ]));
        assert!(zero_interval.is_err());
    }
}
