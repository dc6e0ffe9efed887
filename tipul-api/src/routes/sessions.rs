/// Therapy sessions and session notes
///
/// Two non-cancelled sessions of one therapist never overlap: every create,
/// and every update that touches the times or revives a cancelled session,
/// re-checks the slot. Creating a session opens a `WRITE_SUMMARY` task that
/// writing the note completes.
///
/// # Endpoints
///
/// - `GET /v1/sessions?client_id&start_date&end_date`
/// - `POST /v1/sessions`
/// - `GET|PUT|DELETE /v1/sessions/:id`
/// - `POST|PUT /v1/sessions/:id/note`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{
        clients::owned_client,
        recordings::{with_outputs, RecordingDetail},
    },
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tipul_shared::{
    auth::middleware::AuthContext,
    models::{
        client::Client,
        normalize_optional,
        payment::Payment,
        recording::Recording,
        session::{
            CreateSession, SessionFilter, SessionListItem, SessionStatus, SessionType,
            TherapySession, UpdateSession,
        },
        session_note::SessionNote,
        task::{CreateTask, Task, TaskPriority, TaskType, RELATED_SESSION},
    },
};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub client_id: Option<Uuid>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub client_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(rename = "type")]
    pub session_type: Option<SessionType>,
    pub price_cents: Option<i64>,
    pub location: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub is_recurring: bool,
}

/// Partial session update; a blank location or notes clears it
#[derive(Debug, Deserialize)]
pub struct UpdateSessionRequest {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: Option<SessionStatus>,
    #[serde(rename = "type")]
    pub session_type: Option<SessionType>,
    pub price_cents: Option<i64>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    pub content: String,
    pub is_private: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: TherapySession,
    pub client: Client,
    pub note: Option<SessionNote>,
    pub payment: Option<Payment>,
    pub recordings: Vec<RecordingDetail>,
}

fn session_not_found() -> ApiError {
    ApiError::NotFound("Session not found".to_string())
}

fn check_times(start: DateTime<Utc>, end: DateTime<Utc>) -> ApiResult<()> {
    if end <= start {
        return Err(ApiError::BadRequest(
            "End time must be after start time".to_string(),
        ));
    }
    Ok(())
}

fn check_price(price_cents: i64) -> ApiResult<()> {
    if price_cents < 0 {
        return Err(ApiError::invalid("price_cents", "Price cannot be negative"));
    }
    Ok(())
}

/// Fails with 400 when `[start, end)` overlaps another live session
async fn ensure_slot_free(
    state: &AppState,
    therapist_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    exclude: Option<Uuid>,
) -> ApiResult<()> {
    if let Some(existing) =
        TherapySession::find_conflict(&state.db, therapist_id, start, end, exclude).await?
    {
        tracing::debug!(conflicting_session = %existing.id, "Session slot is taken");
        return Err(ApiError::BadRequest(
            "Another session is already scheduled at this time".to_string(),
        ));
    }
    Ok(())
}

pub(crate) async fn owned_session(
    state: &AppState,
    auth: &AuthContext,
    id: Uuid,
) -> ApiResult<TherapySession> {
    TherapySession::find_owned(&state.db, id, auth.user_id)
        .await?
        .ok_or_else(session_not_found)
}

pub async fn list_sessions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<SessionQuery>,
) -> ApiResult<Json<Vec<SessionListItem>>> {
    let filter = SessionFilter {
        client_id: query.client_id,
        start_date: query.start_date,
        end_date: query.end_date,
    };

    let sessions = TherapySession::list(&state.db, auth.user_id, &filter).await?;
    Ok(Json(sessions))
}

/// Schedules a session and opens its summary task
pub async fn create_session(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateSessionRequest>,
) -> ApiResult<(StatusCode, Json<TherapySession>)> {
    let client = owned_client(&state, &auth, req.client_id).await?;

    check_times(req.start_time, req.end_time)?;
    let price_cents = req.price_cents.unwrap_or_default();
    check_price(price_cents)?;

    ensure_slot_free(&state, auth.user_id, req.start_time, req.end_time, None).await?;

    let session = TherapySession::create(
        &state.db,
        auth.user_id,
        CreateSession {
            client_id: client.id,
            start_time: req.start_time,
            end_time: req.end_time,
            session_type: req.session_type.unwrap_or_default(),
            price_cents,
            location: req.location,
            notes: req.notes,
            is_recurring: req.is_recurring,
        },
    )
    .await?;

    Task::create(
        &state.db,
        CreateTask {
            user_id: auth.user_id,
            task_type: TaskType::WriteSummary,
            title: format!("Write session summary for {}", client.name),
            description: None,
            priority: TaskPriority::Medium,
            due_date: Some(session.end_time),
            related_entity_id: Some(session.id),
            related_entity: Some(RELATED_SESSION.to_string()),
        },
    )
    .await?;

    tracing::info!(session_id = %session.id, client_id = %client.id, "Session created");

    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn get_session(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SessionDetail>> {
    let session = owned_session(&state, &auth, id).await?;
    let client = owned_client(&state, &auth, session.client_id).await?;
    let note = SessionNote::find_by_session(&state.db, id).await?;
    let payment = Payment::find_for_session(&state.db, id).await?;

    let mut recordings = Vec::new();
    for recording in Recording::list_for_session(&state.db, id).await? {
        recordings.push(with_outputs(&state.db, recording.id, recording).await?);
    }

    Ok(Json(SessionDetail {
        session,
        client,
        note,
        payment,
        recordings,
    }))
}

pub async fn update_session(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateSessionRequest>,
) -> ApiResult<Json<TherapySession>> {
    let existing = owned_session(&state, &auth, id).await?;

    let start = req.start_time.unwrap_or(existing.start_time);
    let end = req.end_time.unwrap_or(existing.end_time);
    let status = req.status.unwrap_or(existing.status);
    let times_changed = start != existing.start_time || end != existing.end_time;
    let revived = !existing.status.blocks_slot() && status.blocks_slot();

    check_times(start, end)?;
    if let Some(price_cents) = req.price_cents {
        check_price(price_cents)?;
    }

    if status.blocks_slot() && (times_changed || revived) {
        ensure_slot_free(&state, auth.user_id, start, end, Some(id)).await?;
    }

    let update = UpdateSession {
        start_time: req.start_time,
        end_time: req.end_time,
        status: req.status,
        session_type: req.session_type,
        price_cents: req.price_cents,
        location: req.location.map(|v| normalize_optional(Some(v))),
        notes: req.notes.map(|v| normalize_optional(Some(v))),
    };

    let session = TherapySession::update(&state.db, id, auth.user_id, update)
        .await?
        .ok_or_else(session_not_found)?;

    Ok(Json(session))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !TherapySession::delete(&state.db, id, auth.user_id).await? {
        return Err(session_not_found());
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Writes the session's note and completes its summary task
pub async fn create_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<NoteRequest>,
) -> ApiResult<(StatusCode, Json<SessionNote>)> {
    owned_session(&state, &auth, id).await?;

    if req.content.trim().is_empty() {
        return Err(ApiError::invalid("content", "Note content is required"));
    }

    if SessionNote::find_by_session(&state.db, id).await?.is_some() {
        return Err(ApiError::BadRequest("Note already exists".to_string()));
    }

    let note =
        SessionNote::create(&state.db, id, &req.content, req.is_private.unwrap_or(true)).await?;

    let completed = Task::complete_related(&state.db, id, TaskType::WriteSummary).await?;
    tracing::debug!(session_id = %id, completed, "Session note written");

    Ok((StatusCode::CREATED, Json(note)))
}

pub async fn update_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<NoteRequest>,
) -> ApiResult<Json<SessionNote>> {
    owned_session(&state, &auth, id).await?;

    if req.content.trim().is_empty() {
        return Err(ApiError::invalid("content", "Note content is required"));
    }

    let note = SessionNote::update(&state.db, id, &req.content, req.is_private)
        .await?
        .ok_or_else(|| ApiError::NotFound("Note not found".to_string()))?;

    Ok(Json(note))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_check_times() {
        let start = Utc.with_ymd_and_hms(2025, 3, 2, 9, 0, 0).unwrap();

        assert!(check_times(start, start + Duration::minutes(50)).is_ok());
        assert!(matches!(check_times(start, start), Err(ApiError::BadRequest(_))));
        assert!(check_times(start, start - Duration::minutes(1)).is_err());
    }

    #[test]
    fn test_create_request_defaults() {
        let req: CreateSessionRequest = serde_json::from_value(serde_json::json!({
            "client_id": Uuid::nil(),
            "start_time": "2025-03-02T09:00:00Z",
            "end_time": "2025-03-02T09:50:00Z",
        }))
        .unwrap();

        assert!(req.session_type.is_none());
        assert!(!req.is_recurring);
        assert_eq!(req.session_type.unwrap_or_default(), SessionType::InPerson);
    }

    #[test]
    fn test_update_request_reads_type_field() {
        let req: UpdateSessionRequest =
            serde_json::from_value(serde_json::json!({ "type": "ONLINE", "status": "COMPLETED" }))
                .unwrap();

        assert_eq!(req.session_type, Some(SessionType::Online));
        assert_eq!(req.status, Some(SessionStatus::Completed));
    }
}
