/// In-app notifications
///
/// Rows are produced by the digest and reminder jobs and by nothing else;
/// the therapist can only read, mark or dismiss them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

const NOTIFICATION_COLUMNS: &str = "id, user_id, notification_type, title, content, status, \
                                    scheduled_for, sent_at, read_at, created_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    MorningSummary,
    EveningSummary,
    PendingTasks,
    PaymentReminder,
    SessionReminder,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Read,
    Dismissed,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub notification_type: NotificationType,
    pub title: String,
    pub content: String,
    pub status: NotificationStatus,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNotification {
    pub user_id: Uuid,
    pub notification_type: NotificationType,
    pub title: String,
    pub content: String,
    pub status: NotificationStatus,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
}

impl CreateNotification {
    /// A pending in-app notification scheduled for `now`
    pub fn pending(
        user_id: Uuid,
        notification_type: NotificationType,
        title: impl Into<String>,
        content: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            notification_type,
            title: title.into(),
            content: content.into(),
            status: NotificationStatus::Pending,
            scheduled_for: Some(now),
            sent_at: None,
        }
    }
}

impl Notification {
    pub async fn create(pool: &PgPool, data: CreateNotification) -> Result<Self, sqlx::Error> {
        let notification = sqlx::query_as::<_, Notification>(&format!(
            r#"
            INSERT INTO notifications (user_id, notification_type, title, content, status,
                                       scheduled_for, sent_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(data.user_id)
        .bind(data.notification_type)
        .bind(data.title)
        .bind(data.content)
        .bind(data.status)
        .bind(data.scheduled_for)
        .bind(data.sent_at)
        .fetch_one(pool)
        .await?;

        Ok(notification)
    }

    /// Newest notifications of a user, optionally filtered by status
    pub async fn list(
        pool: &PgPool,
        user_id: Uuid,
        status: Option<NotificationStatus>,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let notifications = sqlx::query_as::<_, Notification>(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS} FROM notifications
            WHERE user_id = $1
              AND ($2::notification_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3
            "#
        ))
        .bind(user_id)
        .bind(status)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(notifications)
    }

    /// Marks every unread (PENDING or SENT) notification of the user as READ
    ///
    /// # Returns
    ///
    /// Number of notifications updated
    pub async fn mark_all_read(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET status = 'READ', read_at = NOW()
            WHERE user_id = $1 AND status IN ('PENDING', 'SENT')
            "#,
        )
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Sets the status of one notification owned by the user
    ///
    /// Moving to READ stamps `read_at`.
    pub async fn set_status(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
        status: NotificationStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        let notification = sqlx::query_as::<_, Notification>(&format!(
            r#"
            UPDATE notifications
            SET status = $3,
                read_at = CASE WHEN $3 = 'READ'::notification_status THEN NOW() ELSE read_at END
            WHERE id = $1 AND user_id = $2
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(status)
        .fetch_optional(pool)
        .await?;

        Ok(notification)
    }
}
