/// Therapy session model and database operations
///
/// # Overlap rule
///
/// Two non-cancelled sessions of the same therapist may not overlap. Intervals
/// are half-open, so a session ending at 10:00 and one starting at 10:00 are
/// fine. The pure check lives in [`crate::scheduling::overlaps`]; the SQL in
/// [`TherapySession::find_conflict`] encodes the same predicate.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE therapy_sessions (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     therapist_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     client_id UUID NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
///     start_time TIMESTAMPTZ NOT NULL,
///     end_time TIMESTAMPTZ NOT NULL,
///     status session_status NOT NULL DEFAULT 'SCHEDULED',
///     session_type session_type NOT NULL DEFAULT 'IN_PERSON',
///     price_cents BIGINT NOT NULL DEFAULT 0,
///     location TEXT,
///     notes TEXT,
///     is_recurring BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CHECK (end_time > start_time)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::normalize_optional;
use super::payment::PaymentStatus;

const SESSION_COLUMNS: &str = "id, therapist_id, client_id, start_time, end_time, status, \
                               session_type, price_cents, location, notes, is_recurring, \
                               created_at, updated_at";

/// Default price used by the recurring generator when a therapist has no sessions yet
pub const DEFAULT_SESSION_PRICE_CENTS: i64 = 30_000;

/// Session lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "session_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "SCHEDULED",
            SessionStatus::Completed => "COMPLETED",
            SessionStatus::Cancelled => "CANCELLED",
            SessionStatus::NoShow => "NO_SHOW",
        }
    }

    /// Whether a session in this status occupies its time slot
    pub fn blocks_slot(&self) -> bool {
        !matches!(self, SessionStatus::Cancelled)
    }
}

/// How the session is held
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "session_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionType {
    InPerson,
    Online,
    Phone,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::InPerson => "IN_PERSON",
            SessionType::Online => "ONLINE",
            SessionType::Phone => "PHONE",
        }
    }

    /// Human-readable label used in e-mails and summaries
    pub fn label(&self) -> &'static str {
        match self {
            SessionType::InPerson => "in-person",
            SessionType::Online => "online",
            SessionType::Phone => "phone",
        }
    }
}

impl Default for SessionType {
    fn default() -> Self {
        SessionType::InPerson
    }
}

/// A scheduled or past therapy session
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TherapySession {
    pub id: Uuid,
    pub therapist_id: Uuid,
    pub client_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: SessionStatus,
    pub session_type: SessionType,

    /// Price in minor currency units
    pub price_cents: i64,

    pub location: Option<String>,
    pub notes: Option<String>,

    /// Created by the recurring-pattern generator
    pub is_recurring: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Session with the client name and note/payment markers, as listed in the calendar
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SessionListItem {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub session: TherapySession,

    pub client_name: String,
    pub client_email: Option<String>,
    pub note_id: Option<Uuid>,
    pub payment_id: Option<Uuid>,
    pub payment_status: Option<PaymentStatus>,
}

/// Filters for listing sessions
///
/// The date range only applies when both bounds are set.
#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    pub client_id: Option<Uuid>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Input for creating a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSession {
    pub client_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub session_type: SessionType,
    pub price_cents: i64,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub is_recurring: bool,
}

/// Partial update of a session; only non-None fields are written
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSession {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: Option<SessionStatus>,
    pub session_type: Option<SessionType>,
    pub price_cents: Option<i64>,
    pub location: Option<Option<String>>,
    pub notes: Option<Option<String>>,
}

impl TherapySession {
    /// Inserts a session
    ///
    /// Conflict checking is the caller's job (see [`TherapySession::find_conflict`]).
    pub async fn create(
        pool: &PgPool,
        therapist_id: Uuid,
        data: CreateSession,
    ) -> Result<Self, sqlx::Error> {
        let session = sqlx::query_as::<_, TherapySession>(&format!(
            r#"
            INSERT INTO therapy_sessions (therapist_id, client_id, start_time, end_time,
                                          session_type, price_cents, location, notes, is_recurring)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(therapist_id)
        .bind(data.client_id)
        .bind(data.start_time)
        .bind(data.end_time)
        .bind(data.session_type)
        .bind(data.price_cents)
        .bind(normalize_optional(data.location))
        .bind(normalize_optional(data.notes))
        .bind(data.is_recurring)
        .fetch_one(pool)
        .await?;

        Ok(session)
    }

    /// Finds a session by ID, scoped to its therapist
    pub async fn find_owned(
        pool: &PgPool,
        id: Uuid,
        therapist_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let session = sqlx::query_as::<_, TherapySession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM therapy_sessions WHERE id = $1 AND therapist_id = $2"
        ))
        .bind(id)
        .bind(therapist_id)
        .fetch_optional(pool)
        .await?;

        Ok(session)
    }

    /// Lists a therapist's sessions in ascending start order
    pub async fn list(
        pool: &PgPool,
        therapist_id: Uuid,
        filter: &SessionFilter,
    ) -> Result<Vec<SessionListItem>, sqlx::Error> {
        let (range_start, range_end) = match (filter.start_date, filter.end_date) {
            (Some(start), Some(end)) => (Some(start), Some(end)),
            _ => (None, None),
        };

        let sessions = sqlx::query_as::<_, SessionListItem>(
            r#"
            SELECT s.id, s.therapist_id, s.client_id, s.start_time, s.end_time, s.status,
                   s.session_type, s.price_cents, s.location, s.notes, s.is_recurring,
                   s.created_at, s.updated_at,
                   c.name AS client_name, c.email AS client_email,
                   n.id AS note_id,
                   p.id AS payment_id, p.status AS payment_status
            FROM therapy_sessions s
            JOIN clients c ON c.id = s.client_id
            LEFT JOIN session_notes n ON n.session_id = s.id
            LEFT JOIN LATERAL (
                SELECT id, status FROM payments
                WHERE session_id = s.id
                ORDER BY created_at DESC
                LIMIT 1
            ) p ON TRUE
            WHERE s.therapist_id = $1
              AND ($2::uuid IS NULL OR s.client_id = $2)
              AND ($3::timestamptz IS NULL OR s.start_time >= $3)
              AND ($4::timestamptz IS NULL OR s.start_time <= $4)
            ORDER BY s.start_time ASC
            "#,
        )
        .bind(therapist_id)
        .bind(filter.client_id)
        .bind(range_start)
        .bind(range_end)
        .fetch_all(pool)
        .await?;

        Ok(sessions)
    }

    /// Most recent sessions of one client, newest first
    pub async fn list_recent_for_client(
        pool: &PgPool,
        client_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sessions = sqlx::query_as::<_, TherapySession>(&format!(
            r#"
            SELECT {SESSION_COLUMNS} FROM therapy_sessions
            WHERE client_id = $1
            ORDER BY start_time DESC
            LIMIT $2
            "#
        ))
        .bind(client_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(sessions)
    }

    /// Finds a non-cancelled session of the therapist overlapping `[start, end)`
    ///
    /// `exclude` skips one session id, used when re-checking an update.
    pub async fn find_conflict(
        pool: &PgPool,
        therapist_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude: Option<Uuid>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let session = sqlx::query_as::<_, TherapySession>(&format!(
            r#"
            SELECT {SESSION_COLUMNS} FROM therapy_sessions
            WHERE therapist_id = $1
              AND status <> 'CANCELLED'
              AND start_time < $3
              AND end_time > $2
              AND ($4::uuid IS NULL OR id <> $4)
            ORDER BY start_time ASC
            LIMIT 1
            "#
        ))
        .bind(therapist_id)
        .bind(start)
        .bind(end)
        .bind(exclude)
        .fetch_optional(pool)
        .await?;

        Ok(session)
    }

    /// Price of the therapist's most recently created session
    pub async fn latest_price(pool: &PgPool, therapist_id: Uuid) -> Result<Option<i64>, sqlx::Error> {
        let price: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT price_cents FROM therapy_sessions
            WHERE therapist_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(therapist_id)
        .fetch_optional(pool)
        .await?;

        Ok(price)
    }

    /// Inserts a scheduled recurring session unless one already starts at exactly `start`
    ///
    /// The existence check and the insert run as a single statement.
    ///
    /// # Returns
    ///
    /// The new session, or None if the slot was already taken
    pub async fn create_recurring_if_free(
        pool: &PgPool,
        therapist_id: Uuid,
        client_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        price_cents: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let session = sqlx::query_as::<_, TherapySession>(&format!(
            r#"
            INSERT INTO therapy_sessions (therapist_id, client_id, start_time, end_time,
                                          status, session_type, price_cents, is_recurring)
            SELECT $1, $2, $3, $4, 'SCHEDULED', 'IN_PERSON', $5, TRUE
            WHERE NOT EXISTS (
                SELECT 1 FROM therapy_sessions
                WHERE therapist_id = $1 AND start_time = $3
            )
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(therapist_id)
        .bind(client_id)
        .bind(start)
        .bind(end)
        .bind(price_cents)
        .fetch_optional(pool)
        .await?;

        Ok(session)
    }

    /// Updates a session owned by the therapist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        therapist_id: Uuid,
        data: UpdateSession,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE therapy_sessions SET updated_at = NOW()");
        let mut bind_count = 2;

        if data.start_time.is_some() {
            bind_count += 1;
            query.push_str(&format!(", start_time = ${}", bind_count));
        }
        if data.end_time.is_some() {
            bind_count += 1;
            query.push_str(&format!(", end_time = ${}", bind_count));
        }
        if data.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }
        if data.session_type.is_some() {
            bind_count += 1;
            query.push_str(&format!(", session_type = ${}", bind_count));
        }
        if data.price_cents.is_some() {
            bind_count += 1;
            query.push_str(&format!(", price_cents = ${}", bind_count));
        }
        if data.location.is_some() {
            bind_count += 1;
            query.push_str(&format!(", location = ${}", bind_count));
        }
        if data.notes.is_some() {
            bind_count += 1;
            query.push_str(&format!(", notes = ${}", bind_count));
        }

        query.push_str(&format!(
            " WHERE id = $1 AND therapist_id = $2 RETURNING {SESSION_COLUMNS}"
        ));

        let mut q = sqlx::query_as::<_, TherapySession>(&query)
            .bind(id)
            .bind(therapist_id);

        if let Some(start_time) = data.start_time {
            q = q.bind(start_time);
        }
        if let Some(end_time) = data.end_time {
            q = q.bind(end_time);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }
        if let Some(session_type) = data.session_type {
            q = q.bind(session_type);
        }
        if let Some(price_cents) = data.price_cents {
            q = q.bind(price_cents);
        }
        if let Some(location) = data.location {
            q = q.bind(normalize_optional(location));
        }
        if let Some(notes) = data.notes {
            q = q.bind(normalize_optional(notes));
        }

        let session = q.fetch_optional(pool).await?;

        Ok(session)
    }

    /// Deletes a session owned by the therapist
    pub async fn delete(pool: &PgPool, id: Uuid, therapist_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM therapy_sessions WHERE id = $1 AND therapist_id = $2")
            .bind(id)
            .bind(therapist_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Scheduled sessions of one therapist starting in `[from, to)`, with client names
    pub async fn list_scheduled_between(
        pool: &PgPool,
        therapist_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<SessionListItem>, sqlx::Error> {
        let sessions = sqlx::query_as::<_, SessionListItem>(
            r#"
            SELECT s.id, s.therapist_id, s.client_id, s.start_time, s.end_time, s.status,
                   s.session_type, s.price_cents, s.location, s.notes, s.is_recurring,
                   s.created_at, s.updated_at,
                   c.name AS client_name, c.email AS client_email,
                   NULL::uuid AS note_id,
                   NULL::uuid AS payment_id, NULL::payment_status AS payment_status
            FROM therapy_sessions s
            JOIN clients c ON c.id = s.client_id
            WHERE s.therapist_id = $1
              AND s.status = 'SCHEDULED'
              AND s.start_time >= $2
              AND s.start_time < $3
            ORDER BY s.start_time ASC
            "#,
        )
        .bind(therapist_id)
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await?;

        Ok(sessions)
    }
}

/// A scheduled session due for a client reminder, across all therapists
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ReminderCandidate {
    pub session_id: Uuid,
    pub therapist_id: Uuid,
    pub therapist_name: String,
    pub client_name: String,
    pub client_email: Option<String>,
    pub start_time: DateTime<Utc>,
    pub session_type: SessionType,
}

impl ReminderCandidate {
    /// Scheduled sessions of every therapist starting in `[from, to)`
    pub async fn find_between(
        pool: &PgPool,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let candidates = sqlx::query_as::<_, ReminderCandidate>(
            r#"
            SELECT s.id AS session_id, s.therapist_id, u.name AS therapist_name,
                   c.name AS client_name, c.email AS client_email,
                   s.start_time, s.session_type
            FROM therapy_sessions s
            JOIN clients c ON c.id = s.client_id
            JOIN users u ON u.id = s.therapist_id
            WHERE s.status = 'SCHEDULED'
              AND s.start_time >= $1
              AND s.start_time < $2
            ORDER BY s.start_time ASC
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await?;

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_does_not_block_slot() {
        assert!(SessionStatus::Scheduled.blocks_slot());
        assert!(SessionStatus::Completed.blocks_slot());
        assert!(SessionStatus::NoShow.blocks_slot());
        assert!(!SessionStatus::Cancelled.blocks_slot());
    }

    #[test]
    fn test_session_type_wire_format() {
        assert_eq!(
            serde_json::to_string(&SessionType::InPerson).unwrap(),
            "\"IN_PERSON\""
        );
        let parsed: SessionStatus = serde_json::from_str("\"NO_SHOW\"").unwrap();
        assert_eq!(parsed, SessionStatus::NoShow);
        assert_eq!(SessionType::default(), SessionType::InPerson);
    }
}
