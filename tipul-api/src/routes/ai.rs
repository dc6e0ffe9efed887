/// Transcription and analysis of recordings
///
/// The handlers run the pipeline in-request: the caller waits for the AI
/// provider and gets the stored result back. Provider failures come back
/// as 502 after the recording has been marked `ERROR`.
///
/// # Endpoints
///
/// - `POST /v1/transcribe` - Transcribe a recording
/// - `POST /v1/analyze` - Analyze a transcription
/// - `POST /v1/analyze/summary` - Summarize raw transcript text

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use tipul_shared::{
    auth::{authorization::require_ownership, middleware::AuthContext},
    models::{
        analysis::{Analysis, AnalysisKind},
        recording::Recording,
        transcription::Transcription,
    },
};
use tipul_worker::pipeline;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct TranscribeRequest {
    pub recording_id: Uuid,
    #[serde(default)]
    pub with_segments: bool,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub transcription_id: Uuid,

    /// `INTAKE` selects the intake analysis; anything else a session analysis
    #[serde(rename = "type")]
    pub analysis_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SummaryRequest {
    pub transcription: String,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub summary: String,
}

fn analysis_kind(requested: Option<&str>) -> AnalysisKind {
    match requested {
        Some(t) if t.eq_ignore_ascii_case("INTAKE") => AnalysisKind::Intake,
        _ => AnalysisKind::Session,
    }
}

pub async fn transcribe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<TranscribeRequest>,
) -> ApiResult<Json<Transcription>> {
    let recording = Recording::find_owned(&state.db, req.recording_id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Recording not found".to_string()))?;

    let transcription = pipeline::transcribe_recording(
        &state.db,
        &state.storage,
        state.transcriber.as_ref(),
        &recording,
        &state.config.integrations.transcription_language,
        req.with_segments,
    )
    .await?;

    Ok(Json(transcription))
}

/// Analyzes a stored transcription
///
/// A transcription of another therapist's recording is 403.
pub async fn analyze(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<AnalyzeRequest>,
) -> ApiResult<Json<Analysis>> {
    let transcription = Transcription::find_by_id(&state.db, req.transcription_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Transcription not found".to_string()))?;

    let recording = Recording::find_by_id(&state.db, transcription.recording_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Recording not found".to_string()))?;

    require_ownership(&auth, recording.therapist_id)?;

    let kind = analysis_kind(req.analysis_type.as_deref());
    let analysis = pipeline::analyze_transcription(
        &state.db,
        state.analyzer.as_ref(),
        &transcription,
        &recording,
        kind,
    )
    .await?;

    Ok(Json(analysis))
}

pub async fn summarize(
    State(state): State<AppState>,
    Json(req): Json<SummaryRequest>,
) -> ApiResult<Json<SummaryResponse>> {
    if req.transcription.trim().is_empty() {
        return Err(ApiError::invalid("transcription", "Transcription is required"));
    }

    let summary = state.analyzer.summarize(&req.transcription).await?;

    Ok(Json(SummaryResponse { summary }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_kind() {
        assert_eq!(analysis_kind(Some("INTAKE")), AnalysisKind::Intake);
        assert_eq!(analysis_kind(Some("intake")), AnalysisKind::Intake);
        assert_eq!(analysis_kind(Some("SESSION")), AnalysisKind::Session);
        assert_eq!(analysis_kind(Some("whatever")), AnalysisKind::Session);
        assert_eq!(analysis_kind(None), AnalysisKind::Session);
    }
}
