/// Session and intake recordings
///
/// Audio arrives base64 encoded in JSON, optionally as a `data:` URL, and
/// is written under `uploads/recordings/`. The row starts `PENDING`; the
/// transcription endpoints move it along.
///
/// # Endpoints
///
/// - `GET /v1/recordings`, `POST /v1/recordings`
/// - `GET /v1/recordings/:id`, `DELETE /v1/recordings/:id`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{clients::owned_client, sessions::owned_session},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tipul_shared::{
    auth::middleware::AuthContext,
    models::{
        analysis::Analysis,
        recording::{CreateRecording, Recording, RecordingListItem, RecordingType},
        task::{CreateTask, Task, TaskPriority, TaskType, RELATED_RECORDING},
        transcription::Transcription,
    },
    storage::{audio_extension_for, UploadStore, RECORDINGS},
};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateRecordingRequest {
    /// Base64 audio, bare or as a `data:<mime>;base64,` URL
    pub audio_data: String,
    pub mime_type: Option<String>,
    pub duration_seconds: i32,
    #[serde(rename = "type")]
    pub recording_type: Option<RecordingType>,
    pub client_id: Option<Uuid>,
    pub session_id: Option<Uuid>,
}

/// A recording with whatever the pipeline has produced for it so far
#[derive(Debug, Serialize)]
pub struct RecordingDetail<R = Recording> {
    #[serde(flatten)]
    pub recording: R,
    pub transcription: Option<Transcription>,
    pub analysis: Option<Analysis>,
}

fn recording_not_found() -> ApiError {
    ApiError::NotFound("Recording not found".to_string())
}

/// Attaches the transcription and analysis of `recording_id`
pub(crate) async fn with_outputs<R>(
    db: &PgPool,
    recording_id: Uuid,
    recording: R,
) -> ApiResult<RecordingDetail<R>> {
    let transcription = Transcription::find_by_recording(db, recording_id).await?;
    let analysis = match &transcription {
        Some(t) => Analysis::find_by_transcription(db, t.id).await?,
        None => None,
    };

    Ok(RecordingDetail {
        recording,
        transcription,
        analysis,
    })
}

/// Splits a `data:` URL into its mime type and payload
fn split_data_url(data: &str) -> (Option<&str>, &str) {
    let Some(rest) = data.strip_prefix("data:") else {
        return (None, data);
    };

    match rest.split_once(',') {
        Some((meta, payload)) => {
            let mime = meta.split(';').next().filter(|m| !m.is_empty());
            (mime, payload)
        }
        None => (None, data),
    }
}

/// Removes a stored upload when the row that should reference it was not written
async fn discard_on_error<T, E>(
    storage: &UploadStore,
    url: &str,
    result: Result<T, E>,
) -> Result<T, E> {
    if result.is_err() {
        if let Err(e) = storage.remove(url).await {
            tracing::warn!(url, error = %e, "Failed to remove orphaned upload");
        }
    }

    result
}

fn decode_audio(data: &str) -> ApiResult<(Option<&str>, Vec<u8>)> {
    let (mime, payload) = split_data_url(data.trim());
    let bytes = BASE64
        .decode(payload.trim())
        .map_err(|_| ApiError::invalid("audio_data", "Audio must be base64 encoded"))?;

    if bytes.is_empty() {
        return Err(ApiError::invalid("audio_data", "Audio is empty"));
    }

    Ok((mime, bytes))
}

pub async fn list_recordings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<RecordingDetail<RecordingListItem>>>> {
    let items = Recording::list(&state.db, auth.user_id, None, None).await?;

    let mut recordings = Vec::with_capacity(items.len());
    for item in items {
        let id = item.recording.id;
        recordings.push(with_outputs(&state.db, id, item).await?);
    }

    Ok(Json(recordings))
}

/// Stores an uploaded recording
///
/// A recording tied to a session inherits the session's client. When a
/// client is known, a `REVIEW_TRANSCRIPTION` task is opened for it.
pub async fn create_recording(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateRecordingRequest>,
) -> ApiResult<(StatusCode, Json<Recording>)> {
    if req.duration_seconds < 0 {
        return Err(ApiError::invalid("duration_seconds", "Duration cannot be negative"));
    }

    let session = match req.session_id {
        Some(id) => Some(owned_session(&state, &auth, id).await?),
        None => None,
    };
    let client = match req.client_id.or(session.as_ref().map(|s| s.client_id)) {
        Some(id) => Some(owned_client(&state, &auth, id).await?),
        None => None,
    };

    let (data_url_mime, bytes) = decode_audio(&req.audio_data)?;
    let extension = audio_extension_for(req.mime_type.as_deref().or(data_url_mime));
    let stored = state.storage.save(RECORDINGS, extension, &bytes).await?;

    let created = Recording::create(
        &state.db,
        auth.user_id,
        CreateRecording {
            client_id: client.as_ref().map(|c| c.id),
            session_id: req.session_id,
            audio_url: stored.url.clone(),
            duration_seconds: req.duration_seconds,
            recording_type: req.recording_type.unwrap_or_default(),
        },
    )
    .await;
    let recording = discard_on_error(&state.storage, &stored.url, created).await?;

    if let Some(client) = &client {
        Task::create(
            &state.db,
            CreateTask {
                user_id: auth.user_id,
                task_type: TaskType::ReviewTranscription,
                title: format!("Review the recording transcript for {}", client.name),
                description: None,
                priority: TaskPriority::Medium,
                due_date: None,
                related_entity_id: Some(recording.id),
                related_entity: Some(RELATED_RECORDING.to_string()),
            },
        )
        .await?;
    }

    tracing::info!(
        recording_id = %recording.id,
        size = bytes.len(),
        "Recording uploaded"
    );

    Ok((StatusCode::CREATED, Json(recording)))
}

pub async fn get_recording(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<RecordingDetail>> {
    let recording = Recording::find_owned(&state.db, id, auth.user_id)
        .await?
        .ok_or_else(recording_not_found)?;

    Ok(Json(with_outputs(&state.db, id, recording).await?))
}

/// Deletes the recording and its audio file
pub async fn delete_recording(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let recording = Recording::delete(&state.db, id, auth.user_id)
        .await?
        .ok_or_else(recording_not_found)?;

    if let Err(e) = state.storage.remove(&recording.audio_url).await {
        tracing::warn!(recording_id = %id, error = %e, "Failed to remove recording audio");
    }

    Ok(StatusCode::NO_CONTENT)
}
