/// Weekly recurring appointment patterns
///
/// A pattern is a (day of week, time, duration, client) tuple. Applying the
/// patterns materializes concrete sessions for upcoming weeks; see
/// [`crate::scheduling::plan_recurring_sessions`].
///
/// ```sql
/// CREATE TABLE recurring_patterns (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     client_id UUID REFERENCES clients(id) ON DELETE SET NULL,
///     day_of_week SMALLINT NOT NULL CHECK (day_of_week BETWEEN 0 AND 6),
///     time TEXT NOT NULL,
///     duration_minutes INTEGER NOT NULL DEFAULT 50,
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

pub const DEFAULT_DURATION_MINUTES: i32 = 50;

const PATTERN_COLUMNS: &str = "p.id, p.user_id, p.client_id, p.day_of_week, p.time, \
                               p.duration_minutes, p.is_active, p.created_at, p.updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RecurringPattern {
    pub id: Uuid,
    pub user_id: Uuid,
    pub client_id: Option<Uuid>,

    /// 0 = Sunday … 6 = Saturday
    pub day_of_week: i16,

    /// Local start time, `HH:MM`
    pub time: String,

    pub duration_minutes: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RecurringPatternListItem {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub pattern: RecurringPattern,

    pub client_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRecurringPattern {
    pub client_id: Option<Uuid>,
    pub day_of_week: i16,
    pub time: String,
    pub duration_minutes: i32,
}

/// Partial update; absent fields keep their values
///
/// `client_id: Some(None)` detaches the client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRecurringPattern {
    pub client_id: Option<Option<Uuid>>,
    pub day_of_week: Option<i16>,
    pub time: Option<String>,
    pub duration_minutes: Option<i32>,
    pub is_active: Option<bool>,
}

impl RecurringPattern {
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        data: CreateRecurringPattern,
    ) -> Result<Self, sqlx::Error> {
        let pattern = sqlx::query_as::<_, RecurringPattern>(
            r#"
            INSERT INTO recurring_patterns (user_id, client_id, day_of_week, time, duration_minutes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, client_id, day_of_week, time, duration_minutes, is_active,
                      created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(data.client_id)
        .bind(data.day_of_week)
        .bind(data.time)
        .bind(data.duration_minutes)
        .fetch_one(pool)
        .await?;

        Ok(pattern)
    }

    pub async fn find_owned(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let pattern = sqlx::query_as::<_, RecurringPattern>(&format!(
            "SELECT {PATTERN_COLUMNS} FROM recurring_patterns p WHERE p.id = $1 AND p.user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(pattern)
    }

    /// Patterns ordered by weekday, then time
    pub async fn list(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<RecurringPatternListItem>, sqlx::Error> {
        let patterns = sqlx::query_as::<_, RecurringPatternListItem>(&format!(
            r#"
            SELECT {PATTERN_COLUMNS}, c.name AS client_name
            FROM recurring_patterns p
            LEFT JOIN clients c ON c.id = p.client_id
            WHERE p.user_id = $1
            ORDER BY p.day_of_week ASC, p.time ASC
            "#
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(patterns)
    }

    pub async fn list_active(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let patterns = sqlx::query_as::<_, RecurringPattern>(&format!(
            r#"
            SELECT {PATTERN_COLUMNS} FROM recurring_patterns p
            WHERE p.user_id = $1 AND p.is_active = TRUE
            ORDER BY p.day_of_week ASC, p.time ASC
            "#
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(patterns)
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
        data: UpdateRecurringPattern,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE recurring_patterns SET updated_at = NOW()");
        let mut bind_count = 2;

        if data.client_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(", client_id = ${}", bind_count));
        }
        if data.day_of_week.is_some() {
            bind_count += 1;
            query.push_str(&format!(", day_of_week = ${}", bind_count));
        }
        if data.time.is_some() {
            bind_count += 1;
            query.push_str(&format!(", time = ${}", bind_count));
        }
        if data.duration_minutes.is_some() {
            bind_count += 1;
            query.push_str(&format!(", duration_minutes = ${}", bind_count));
        }
        if data.is_active.is_some() {
            bind_count += 1;
            query.push_str(&format!(", is_active = ${}", bind_count));
        }

        query.push_str(
            " WHERE id = $1 AND user_id = $2 RETURNING id, user_id, client_id, day_of_week, \
             time, duration_minutes, is_active, created_at, updated_at",
        );

        let mut q = sqlx::query_as::<_, RecurringPattern>(&query)
            .bind(id)
            .bind(user_id);

        if let Some(client_id) = data.client_id {
            q = q.bind(client_id);
        }
        if let Some(day_of_week) = data.day_of_week {
            q = q.bind(day_of_week);
        }
        if let Some(time) = data.time {
            q = q.bind(time);
        }
        if let Some(duration_minutes) = data.duration_minutes {
            q = q.bind(duration_minutes);
        }
        if let Some(is_active) = data.is_active {
            q = q.bind(is_active);
        }

        let pattern = q.fetch_optional(pool).await?;

        Ok(pattern)
    }

    pub async fn delete(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM recurring_patterns WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
