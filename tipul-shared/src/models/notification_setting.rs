/// Per-channel notification preferences
///
/// Every user gets an `email` and a `push` row at registration. The digest
/// job reads the first enabled row (email before push) to decide the
/// overdue-payment threshold and the monthly reminder day.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

const SETTING_COLUMNS: &str = "id, user_id, channel, enabled, morning_time, evening_time, \
                               debt_threshold_days, monthly_reminder_day, created_at, updated_at";

pub const DEFAULT_MORNING_TIME: &str = "08:00";
pub const DEFAULT_EVENING_TIME: &str = "20:00";
pub const DEFAULT_DEBT_THRESHOLD_DAYS: i32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_channel", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
    Email,
    Push,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct NotificationSetting {
    pub id: Uuid,
    pub user_id: Uuid,
    pub channel: NotificationChannel,
    pub enabled: bool,

    /// `HH:MM` local time for the morning summary
    pub morning_time: String,

    /// `HH:MM` local time for the evening summary
    pub evening_time: String,

    /// Pending payments older than this many days are reported as overdue
    pub debt_threshold_days: i32,

    /// Day of month (1-31) for the monthly outstanding-payments reminder
    pub monthly_reminder_day: Option<i32>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values written to a channel row on upsert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertNotificationSetting {
    pub channel: NotificationChannel,
    pub enabled: bool,
    pub morning_time: String,
    pub evening_time: String,
    pub debt_threshold_days: i32,
    pub monthly_reminder_day: Option<i32>,
}

impl NotificationSetting {
    /// All channel rows of a user, email first
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let settings = sqlx::query_as::<_, NotificationSetting>(&format!(
            "SELECT {SETTING_COLUMNS} FROM notification_settings WHERE user_id = $1 ORDER BY channel"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(settings)
    }

    /// Inserts or replaces the row for `(user_id, channel)`
    pub async fn upsert(
        pool: &PgPool,
        user_id: Uuid,
        data: UpsertNotificationSetting,
    ) -> Result<Self, sqlx::Error> {
        let setting = sqlx::query_as::<_, NotificationSetting>(&format!(
            r#"
            INSERT INTO notification_settings (user_id, channel, enabled, morning_time,
                                               evening_time, debt_threshold_days,
                                               monthly_reminder_day)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id, channel) DO UPDATE
            SET enabled = EXCLUDED.enabled,
                morning_time = EXCLUDED.morning_time,
                evening_time = EXCLUDED.evening_time,
                debt_threshold_days = EXCLUDED.debt_threshold_days,
                monthly_reminder_day = EXCLUDED.monthly_reminder_day,
                updated_at = NOW()
            RETURNING {SETTING_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(data.channel)
        .bind(data.enabled)
        .bind(data.morning_time)
        .bind(data.evening_time)
        .bind(data.debt_threshold_days)
        .bind(data.monthly_reminder_day)
        .fetch_one(pool)
        .await?;

        Ok(setting)
    }

    /// The first enabled setting of every user that has one
    ///
    /// One row per user; email wins over push when both are enabled.
    pub async fn first_enabled_per_user(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let settings = sqlx::query_as::<_, NotificationSetting>(&format!(
            r#"
            SELECT DISTINCT ON (user_id) {SETTING_COLUMNS}
            FROM notification_settings
            WHERE enabled = TRUE
            ORDER BY user_id, channel
            "#
        ))
        .fetch_all(pool)
        .await?;

        Ok(settings)
    }
}
