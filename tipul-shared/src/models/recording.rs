/// Audio recording model and processing state machine
///
/// # State Machine
///
/// ```text
/// PENDING → TRANSCRIBING → TRANSCRIBED → ANALYZED
///     any → ERROR        (transcription or analysis failed)
///     any → TRANSCRIBING (retry)
/// ```
///
/// # Schema
///
/// ```sql
/// CREATE TABLE recordings (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     therapist_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     client_id UUID REFERENCES clients(id) ON DELETE CASCADE,
///     session_id UUID REFERENCES therapy_sessions(id) ON DELETE SET NULL,
///     audio_url TEXT NOT NULL,
///     duration_seconds INTEGER NOT NULL DEFAULT 0,
///     recording_type recording_type NOT NULL DEFAULT 'SESSION',
///     status recording_status NOT NULL DEFAULT 'PENDING',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

const RECORDING_COLUMNS: &str = "r.id, r.therapist_id, r.client_id, r.session_id, r.audio_url, \
                                 r.duration_seconds, r.recording_type, r.status, r.created_at, \
                                 r.updated_at";

/// What kind of conversation was recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "recording_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordingType {
    /// First meeting with a new client
    Intake,

    /// Regular therapy session
    Session,
}

impl Default for RecordingType {
    fn default() -> Self {
        RecordingType::Session
    }
}

/// Processing state of a recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "recording_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordingStatus {
    /// Uploaded, not processed yet
    Pending,

    /// Transcription call in flight
    Transcribing,

    /// Transcription stored
    Transcribed,

    /// Analysis stored
    Analyzed,

    /// Last processing attempt failed
    Error,
}

impl RecordingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordingStatus::Pending => "PENDING",
            RecordingStatus::Transcribing => "TRANSCRIBING",
            RecordingStatus::Transcribed => "TRANSCRIBED",
            RecordingStatus::Analyzed => "ANALYZED",
            RecordingStatus::Error => "ERROR",
        }
    }

    /// Checks if transition to target state is valid
    pub fn can_transition_to(&self, target: RecordingStatus) -> bool {
        match (self, target) {
            // Any state may fail or be retried
            (_, RecordingStatus::Error) => true,
            (_, RecordingStatus::Transcribing) => true,

            (RecordingStatus::Transcribing, RecordingStatus::Transcribed) => true,

            // Analysis may be re-run on an analyzed recording
            (RecordingStatus::Transcribed, RecordingStatus::Analyzed) => true,
            (RecordingStatus::Analyzed, RecordingStatus::Analyzed) => true,
            (RecordingStatus::Error, RecordingStatus::Analyzed) => true,

            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Recording {
    pub id: Uuid,

    /// Owning therapist
    pub therapist_id: Uuid,

    pub client_id: Option<Uuid>,
    pub session_id: Option<Uuid>,

    /// Public path under the uploads root, e.g. `/uploads/recordings/<uuid>.webm`
    pub audio_url: String,

    pub duration_seconds: i32,
    pub recording_type: RecordingType,
    pub status: RecordingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Recording with display context for lists
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RecordingListItem {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub recording: Recording,

    pub client_name: Option<String>,
    pub session_start: Option<DateTime<Utc>>,
    pub transcription_id: Option<Uuid>,
    pub analysis_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRecording {
    pub client_id: Option<Uuid>,
    pub session_id: Option<Uuid>,
    pub audio_url: String,
    pub duration_seconds: i32,
    pub recording_type: RecordingType,
}

impl Recording {
    pub async fn create(
        pool: &PgPool,
        therapist_id: Uuid,
        data: CreateRecording,
    ) -> Result<Self, sqlx::Error> {
        let recording = sqlx::query_as::<_, Recording>(
            r#"
            INSERT INTO recordings (therapist_id, client_id, session_id, audio_url,
                                    duration_seconds, recording_type)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, therapist_id, client_id, session_id, audio_url, duration_seconds,
                      recording_type, status, created_at, updated_at
            "#,
        )
        .bind(therapist_id)
        .bind(data.client_id)
        .bind(data.session_id)
        .bind(data.audio_url)
        .bind(data.duration_seconds)
        .bind(data.recording_type)
        .fetch_one(pool)
        .await?;

        Ok(recording)
    }

    /// Finds a recording by ID without an owner check
    ///
    /// Used by the processing pipeline, which is handed ids that were
    /// already authorized.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let recording = sqlx::query_as::<_, Recording>(&format!(
            "SELECT {RECORDING_COLUMNS} FROM recordings r WHERE r.id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(recording)
    }

    pub async fn find_owned(
        pool: &PgPool,
        id: Uuid,
        therapist_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let recording = sqlx::query_as::<_, Recording>(&format!(
            "SELECT {RECORDING_COLUMNS} FROM recordings r WHERE r.id = $1 AND r.therapist_id = $2"
        ))
        .bind(id)
        .bind(therapist_id)
        .fetch_optional(pool)
        .await?;

        Ok(recording)
    }

    /// Lists recordings newest first
    ///
    /// `client_id` narrows to one client; `limit` caps the result.
    pub async fn list(
        pool: &PgPool,
        therapist_id: Uuid,
        client_id: Option<Uuid>,
        limit: Option<i64>,
    ) -> Result<Vec<RecordingListItem>, sqlx::Error> {
        let recordings = sqlx::query_as::<_, RecordingListItem>(&format!(
            r#"
            SELECT {RECORDING_COLUMNS},
                   c.name AS client_name,
                   s.start_time AS session_start,
                   t.id AS transcription_id,
                   a.id AS analysis_id
            FROM recordings r
            LEFT JOIN clients c ON c.id = r.client_id
            LEFT JOIN therapy_sessions s ON s.id = r.session_id
            LEFT JOIN transcriptions t ON t.recording_id = r.id
            LEFT JOIN analyses a ON a.transcription_id = t.id
            WHERE r.therapist_id = $1
              AND ($2::uuid IS NULL OR r.client_id = $2)
            ORDER BY r.created_at DESC
            LIMIT $3
            "#
        ))
        .bind(therapist_id)
        .bind(client_id)
        .bind(limit.unwrap_or(i64::MAX))
        .fetch_all(pool)
        .await?;

        Ok(recordings)
    }

    /// Recordings attached to one session
    pub async fn list_for_session(pool: &PgPool, session_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let recordings = sqlx::query_as::<_, Recording>(&format!(
            r#"
            SELECT {RECORDING_COLUMNS} FROM recordings r
            WHERE r.session_id = $1
            ORDER BY r.created_at DESC
            "#
        ))
        .bind(session_id)
        .fetch_all(pool)
        .await?;

        Ok(recordings)
    }

    /// Sets the processing status
    pub async fn set_status(
        pool: &PgPool,
        id: Uuid,
        status: RecordingStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE recordings SET status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a recording owned by the therapist
    ///
    /// # Returns
    ///
    /// The deleted row, so the caller can remove the audio file
    pub async fn delete(
        pool: &PgPool,
        id: Uuid,
        therapist_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let recording = sqlx::query_as::<_, Recording>(
            r#"
            DELETE FROM recordings
            WHERE id = $1 AND therapist_id = $2
            RETURNING id, therapist_id, client_id, session_id, audio_url, duration_seconds,
                      recording_type, status, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(therapist_id)
        .fetch_optional(pool)
        .await?;

        Ok(recording)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        assert!(RecordingStatus::Pending.can_transition_to(RecordingStatus::Transcribing));
        assert!(RecordingStatus::Transcribing.can_transition_to(RecordingStatus::Transcribed));
        assert!(RecordingStatus::Transcribed.can_transition_to(RecordingStatus::Analyzed));
    }

    #[test]
    fn test_any_state_can_fail_or_retry() {
        for status in [
            RecordingStatus::Pending,
            RecordingStatus::Transcribing,
            RecordingStatus::Transcribed,
            RecordingStatus::Analyzed,
            RecordingStatus::Error,
        ] {
            assert!(status.can_transition_to(RecordingStatus::Error));
            assert!(status.can_transition_to(RecordingStatus::Transcribing));
        }
    }

    #[test]
    fn test_cannot_skip_transcription() {
        assert!(!RecordingStatus::Pending.can_transition_to(RecordingStatus::Analyzed));
        assert!(!RecordingStatus::Pending.can_transition_to(RecordingStatus::Transcribed));
        assert!(!RecordingStatus::Analyzed.can_transition_to(RecordingStatus::Pending));
    }

    #[test]
    fn test_recording_type_default() {
        assert_eq!(RecordingType::default(), RecordingType::Session);
        assert_eq!(RecordingStatus::Transcribed.as_str(), "TRANSCRIBED");
    }
}
