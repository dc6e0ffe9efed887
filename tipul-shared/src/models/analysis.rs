/// Structured AI analysis of a transcription
///
/// Session and intake analyses share one table. For intake analyses the
/// client profile is folded into the common columns:
///
/// | column               | session analysis      | intake analysis           |
/// |----------------------|-----------------------|---------------------------|
/// | `summary`            | session summary       | client background         |
/// | `key_topics`         | topics discussed      | presenting issues         |
/// | `emotional_markers`  | markers               | empty                     |
/// | `recommendations`    | recommendations       | recommendations           |
/// | `risk_factors`       | empty                 | risk factors              |
/// | `next_session_notes` | notes for next time   | treatment goals, joined   |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

const ANALYSIS_COLUMNS: &str = "id, transcription_id, kind, summary, key_topics, emotional_markers, \
                                recommendations, risk_factors, next_session_notes, created_at, \
                                updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "analysis_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisKind {
    Session,
    Intake,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Low,
    Medium,
    High,
}

/// An emotion observed in the session, with how strongly and where
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmotionalMarker {
    pub emotion: String,
    pub intensity: Intensity,
    #[serde(default)]
    pub context: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Analysis {
    pub id: Uuid,
    pub transcription_id: Uuid,
    pub kind: AnalysisKind,
    pub summary: String,
    pub key_topics: Json<Vec<String>>,
    pub emotional_markers: Json<Vec<EmotionalMarker>>,
    pub recommendations: Json<Vec<String>>,
    pub risk_factors: Json<Vec<String>>,
    pub next_session_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAnalysis {
    pub transcription_id: Uuid,
    pub kind: AnalysisKind,
    pub summary: String,
    pub key_topics: Vec<String>,
    pub emotional_markers: Vec<EmotionalMarker>,
    pub recommendations: Vec<String>,
    pub risk_factors: Vec<String>,
    pub next_session_notes: Option<String>,
}

impl Analysis {
    /// Inserts the analysis, replacing any previous one for the transcription
    pub async fn upsert(pool: &PgPool, data: NewAnalysis) -> Result<Self, sqlx::Error> {
        let analysis = sqlx::query_as::<_, Analysis>(&format!(
            r#"
            INSERT INTO analyses (transcription_id, kind, summary, key_topics, emotional_markers,
                                  recommendations, risk_factors, next_session_notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (transcription_id) DO UPDATE
            SET kind = EXCLUDED.kind,
                summary = EXCLUDED.summary,
                key_topics = EXCLUDED.key_topics,
                emotional_markers = EXCLUDED.emotional_markers,
                recommendations = EXCLUDED.recommendations,
                risk_factors = EXCLUDED.risk_factors,
                next_session_notes = EXCLUDED.next_session_notes,
                updated_at = NOW()
            RETURNING {ANALYSIS_COLUMNS}
            "#
        ))
        .bind(data.transcription_id)
        .bind(data.kind)
        .bind(data.summary)
        .bind(Json(data.key_topics))
        .bind(Json(data.emotional_markers))
        .bind(Json(data.recommendations))
        .bind(Json(data.risk_factors))
        .bind(data.next_session_notes)
        .fetch_one(pool)
        .await?;

        Ok(analysis)
    }

    pub async fn find_by_transcription(
        pool: &PgPool,
        transcription_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let analysis = sqlx::query_as::<_, Analysis>(&format!(
            "SELECT {ANALYSIS_COLUMNS} FROM analyses WHERE transcription_id = $1"
        ))
        .bind(transcription_id)
        .fetch_optional(pool)
        .await?;

        Ok(analysis)
    }
}
