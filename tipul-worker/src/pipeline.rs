/// Recording pipeline: audio to transcription to analysis
///
/// Each step moves the recording's status forward and sets it to ERROR
/// when any part of the step fails, so the therapist sees the failure
/// and can retry. Ownership is checked by the caller.
///
/// ```text
/// PENDING ─> TRANSCRIBING ─> TRANSCRIBED ─> ANALYZED
///                 │               │
///                 └──> ERROR <────┘
/// ```

use sqlx::PgPool;

use tipul_shared::models::analysis::{Analysis, AnalysisKind};
use tipul_shared::models::recording::{Recording, RecordingStatus};
use tipul_shared::models::task::{Task, TaskType};
use tipul_shared::models::transcription::{NewTranscription, Transcription};
use tipul_shared::storage::{audio_mime_for, StorageError, UploadStore};

use crate::ai::{AiError, Analyzer, Transcriber};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Audio file unavailable: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Ai(#[from] AiError),

    #[error("Failed to encode segments: {0}")]
    Segments(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Marks the recording as failed, logging instead of masking the original error
async fn mark_error(pool: &PgPool, recording_id: uuid::Uuid) {
    if let Err(e) = Recording::set_status(pool, recording_id, RecordingStatus::Error).await {
        tracing::error!(recording_id = %recording_id, error = %e, "Failed to mark recording as ERROR");
    }
}

async fn transcribe_inner(
    pool: &PgPool,
    store: &UploadStore,
    transcriber: &dyn Transcriber,
    recording: &Recording,
    language: &str,
    with_segments: bool,
) -> Result<Transcription, PipelineError> {
    Recording::set_status(pool, recording.id, RecordingStatus::Transcribing).await?;

    let audio = store.read(&recording.audio_url).await?;
    let mime_type = audio_mime_for(&recording.audio_url);

    tracing::info!(
        recording_id = %recording.id,
        provider = transcriber.name(),
        mime_type,
        bytes = audio.len(),
        "Transcribing recording"
    );

    let output = transcriber.transcribe(&audio, mime_type, with_segments).await?;

    let segments = match output.segments {
        Some(segments) => Some(serde_json::to_value(segments)?),
        None => None,
    };

    let transcription = Transcription::upsert(
        pool,
        NewTranscription {
            recording_id: recording.id,
            content: output.text,
            language: language.to_string(),
            confidence: output.confidence,
            segments,
        },
    )
    .await?;

    Recording::set_status(pool, recording.id, RecordingStatus::Transcribed).await?;

    Ok(transcription)
}

/// Transcribes a recording's audio and stores the result
///
/// Replaces an earlier transcription of the same recording, which makes
/// this the retry path for recordings in ERROR.
pub async fn transcribe_recording(
    pool: &PgPool,
    store: &UploadStore,
    transcriber: &dyn Transcriber,
    recording: &Recording,
    language: &str,
    with_segments: bool,
) -> Result<Transcription, PipelineError> {
    match transcribe_inner(pool, store, transcriber, recording, language, with_segments).await {
        Ok(transcription) => {
            tracing::info!(
                recording_id = %recording.id,
                transcription_id = %transcription.id,
                "Recording transcribed"
            );
            Ok(transcription)
        }
        Err(e) => {
            tracing::warn!(recording_id = %recording.id, error = %e, "Transcription failed");
            mark_error(pool, recording.id).await;
            Err(e)
        }
    }
}

async fn analyze_inner(
    pool: &PgPool,
    analyzer: &dyn Analyzer,
    transcription: &Transcription,
    recording: &Recording,
    kind: AnalysisKind,
) -> Result<Analysis, PipelineError> {
    tracing::info!(
        transcription_id = %transcription.id,
        provider = analyzer.name(),
        ?kind,
        "Analyzing transcription"
    );

    let new_analysis = match kind {
        AnalysisKind::Intake => analyzer
            .analyze_intake(&transcription.content)
            .await?
            .into_new_analysis(transcription.id),
        AnalysisKind::Session => analyzer
            .analyze_session(&transcription.content)
            .await?
            .into_new_analysis(transcription.id),
    };

    let analysis = Analysis::upsert(pool, new_analysis).await?;

    Recording::set_status(pool, recording.id, RecordingStatus::Analyzed).await?;

    let completed = Task::complete_related(pool, recording.id, TaskType::ReviewTranscription).await?;
    if completed > 0 {
        tracing::debug!(recording_id = %recording.id, completed, "Review tasks completed");
    }

    Ok(analysis)
}

/// Analyzes a stored transcription and marks its recording ANALYZED
pub async fn analyze_transcription(
    pool: &PgPool,
    analyzer: &dyn Analyzer,
    transcription: &Transcription,
    recording: &Recording,
    kind: AnalysisKind,
) -> Result<Analysis, PipelineError> {
    match analyze_inner(pool, analyzer, transcription, recording, kind).await {
        Ok(analysis) => Ok(analysis),
        Err(e) => {
            tracing::warn!(transcription_id = %transcription.id, error = %e, "Analysis failed");
            mark_error(pool, recording.id).await;
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = PipelineError::from(StorageError::NotFound);
        assert!(err.to_string().starts_with("Audio file unavailable"));

        let err = PipelineError::from(AiError::NotConfigured("GOOGLE_AI_API_KEY"));
        assert_eq!(err.to_string(), "GOOGLE_AI_API_KEY is not configured");
    }
}
