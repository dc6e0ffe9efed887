/// Transcriptions: one text per recording
///
/// Re-transcribing a recording replaces the previous text in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

const TRANSCRIPTION_COLUMNS: &str =
    "id, recording_id, content, language, confidence, segments, created_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Transcription {
    pub id: Uuid,
    pub recording_id: Uuid,

    /// Full transcript text
    pub content: String,

    /// ISO 639-1 language code, "he" unless configured otherwise
    pub language: String,

    pub confidence: Option<f64>,

    /// Optional timestamped segments `[{start, end, speaker, text}]`
    pub segments: Option<JsonValue>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTranscription {
    pub recording_id: Uuid,
    pub content: String,
    pub language: String,
    pub confidence: Option<f64>,
    pub segments: Option<JsonValue>,
}

impl Transcription {
    /// Inserts the transcription, replacing any previous one for the recording
    pub async fn upsert(pool: &PgPool, data: NewTranscription) -> Result<Self, sqlx::Error> {
        let transcription = sqlx::query_as::<_, Transcription>(&format!(
            r#"
            INSERT INTO transcriptions (recording_id, content, language, confidence, segments)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (recording_id) DO UPDATE
            SET content = EXCLUDED.content,
                language = EXCLUDED.language,
                confidence = EXCLUDED.confidence,
                segments = EXCLUDED.segments,
                updated_at = NOW()
            RETURNING {TRANSCRIPTION_COLUMNS}
            "#
        ))
        .bind(data.recording_id)
        .bind(data.content)
        .bind(data.language)
        .bind(data.confidence)
        .bind(data.segments)
        .fetch_one(pool)
        .await?;

        Ok(transcription)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let transcription = sqlx::query_as::<_, Transcription>(&format!(
            "SELECT {TRANSCRIPTION_COLUMNS} FROM transcriptions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(transcription)
    }

    pub async fn find_by_recording(
        pool: &PgPool,
        recording_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let transcription = sqlx::query_as::<_, Transcription>(&format!(
            "SELECT {TRANSCRIPTION_COLUMNS} FROM transcriptions WHERE recording_id = $1"
        ))
        .bind(recording_id)
        .fetch_optional(pool)
        .await?;

        Ok(transcription)
    }
}
