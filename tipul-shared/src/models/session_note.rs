/// Session notes: at most one per session
///
/// ```sql
/// CREATE TABLE session_notes (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     session_id UUID NOT NULL UNIQUE REFERENCES therapy_sessions(id) ON DELETE CASCADE,
///     content TEXT NOT NULL,
///     is_private BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SessionNote {
    pub id: Uuid,
    pub session_id: Uuid,
    pub content: String,

    /// Private notes are never shared with the client
    pub is_private: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionNote {
    /// Creates the note for a session
    ///
    /// # Errors
    ///
    /// Fails with a unique violation if the session already has a note.
    pub async fn create(
        pool: &PgPool,
        session_id: Uuid,
        content: &str,
        is_private: bool,
    ) -> Result<Self, sqlx::Error> {
        let note = sqlx::query_as::<_, SessionNote>(
            r#"
            INSERT INTO session_notes (session_id, content, is_private)
            VALUES ($1, $2, $3)
            RETURNING id, session_id, content, is_private, created_at, updated_at
            "#,
        )
        .bind(session_id)
        .bind(content)
        .bind(is_private)
        .fetch_one(pool)
        .await?;

        Ok(note)
    }

    pub async fn find_by_session(
        pool: &PgPool,
        session_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let note = sqlx::query_as::<_, SessionNote>(
            r#"
            SELECT id, session_id, content, is_private, created_at, updated_at
            FROM session_notes
            WHERE session_id = $1
            "#,
        )
        .bind(session_id)
        .fetch_optional(pool)
        .await?;

        Ok(note)
    }

    /// Notes for a batch of sessions
    pub async fn find_by_sessions(
        pool: &PgPool,
        session_ids: &[Uuid],
    ) -> Result<Vec<Self>, sqlx::Error> {
        let notes = sqlx::query_as::<_, SessionNote>(
            r#"
            SELECT id, session_id, content, is_private, created_at, updated_at
            FROM session_notes
            WHERE session_id = ANY($1)
            "#,
        )
        .bind(session_ids)
        .fetch_all(pool)
        .await?;

        Ok(notes)
    }

    /// Replaces the content (and optionally the privacy flag) of an existing note
    ///
    /// # Returns
    ///
    /// None if the session has no note yet
    pub async fn update(
        pool: &PgPool,
        session_id: Uuid,
        content: &str,
        is_private: Option<bool>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let note = sqlx::query_as::<_, SessionNote>(
            r#"
            UPDATE session_notes
            SET content = $2,
                is_private = COALESCE($3, is_private),
                updated_at = NOW()
            WHERE session_id = $1
            RETURNING id, session_id, content, is_private, created_at, updated_at
            "#,
        )
        .bind(session_id)
        .bind(content)
        .bind(is_private)
        .fetch_optional(pool)
        .await?;

        Ok(note)
    }
}
