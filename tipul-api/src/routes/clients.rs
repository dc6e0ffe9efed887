/// Client records of the signed-in therapist
///
/// # Endpoints
///
/// - `GET /v1/clients` - All clients by name, with session and payment counts
/// - `POST /v1/clients` - Create a client
/// - `GET /v1/clients/:id` - Client with recent history
/// - `PUT /v1/clients/:id` - Update a client
/// - `DELETE /v1/clients/:id` - Delete a client and its history

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::recordings::{with_outputs, RecordingDetail},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Serialize;
use std::collections::HashMap;
use tipul_shared::{
    auth::middleware::AuthContext,
    models::{
        client::{Client, ClientWithCounts, CreateClient, UpdateClient},
        document::{Document, DocumentListItem},
        payment::Payment,
        recording::Recording,
        session::TherapySession,
        session_note::SessionNote,
    },
};
use uuid::Uuid;

const RECENT_SESSIONS: i64 = 10;
const RECENT_PAYMENTS: i64 = 10;
const RECENT_RECORDINGS: i64 = 5;

/// A session in the client's history, with its note when written
#[derive(Debug, Serialize)]
pub struct SessionWithNote {
    #[serde(flatten)]
    pub session: TherapySession,
    pub note: Option<SessionNote>,
}

#[derive(Debug, Serialize)]
pub struct ClientDetail {
    #[serde(flatten)]
    pub client: Client,
    pub sessions: Vec<SessionWithNote>,
    pub payments: Vec<Payment>,
    pub recordings: Vec<RecordingDetail>,
    pub documents: Vec<DocumentListItem>,
}

pub(crate) fn client_not_found() -> ApiError {
    ApiError::NotFound("Client not found".to_string())
}

/// Loads a client owned by the caller or fails with 404
pub(crate) async fn owned_client(
    state: &AppState,
    auth: &AuthContext,
    client_id: Uuid,
) -> ApiResult<Client> {
    Client::find_owned(&state.db, client_id, auth.user_id)
        .await?
        .ok_or_else(client_not_found)
}

pub async fn list_clients(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<ClientWithCounts>>> {
    let clients = Client::list_with_counts(&state.db, auth.user_id).await?;
    Ok(Json(clients))
}

/// Creates a client; the name is trimmed and must not be blank
pub async fn create_client(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateClient>,
) -> ApiResult<(StatusCode, Json<Client>)> {
    if req.name.trim().is_empty() {
        return Err(ApiError::invalid("name", "Name is required"));
    }

    let client = Client::create(&state.db, auth.user_id, req).await?;

    tracing::info!(client_id = %client.id, therapist_id = %auth.user_id, "Client created");

    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn get_client(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ClientDetail>> {
    let client = owned_client(&state, &auth, id).await?;

    let sessions = TherapySession::list_recent_for_client(&state.db, id, RECENT_SESSIONS).await?;
    let session_ids: Vec<Uuid> = sessions.iter().map(|s| s.id).collect();
    let mut notes: HashMap<Uuid, SessionNote> = SessionNote::find_by_sessions(&state.db, &session_ids)
        .await?
        .into_iter()
        .map(|note| (note.session_id, note))
        .collect();

    let sessions = sessions
        .into_iter()
        .map(|session| SessionWithNote {
            note: notes.remove(&session.id),
            session,
        })
        .collect();

    let payments = Payment::list_recent_for_client(&state.db, id, RECENT_PAYMENTS).await?;

    let recent = Recording::list(&state.db, auth.user_id, Some(id), Some(RECENT_RECORDINGS)).await?;
    let mut recordings = Vec::with_capacity(recent.len());
    for item in recent {
        recordings.push(with_outputs(&state.db, item.recording.id, item.recording).await?);
    }

    let documents = Document::list(&state.db, auth.user_id, Some(id)).await?;

    Ok(Json(ClientDetail {
        client,
        sessions,
        payments,
        recordings,
        documents,
    }))
}

/// Updates a client
///
/// Absent name and status keep their values; the other optional fields
/// are replaced, so leaving one out clears it.
pub async fn update_client(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateClient>,
) -> ApiResult<Json<Client>> {
    let client = Client::update(&state.db, id, auth.user_id, req)
        .await?
        .ok_or_else(client_not_found)?;

    Ok(Json(client))
}

pub async fn delete_client(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !Client::delete(&state.db, id, auth.user_id).await? {
        return Err(client_not_found());
    }

    tracing::info!(client_id = %id, "Client deleted");

    Ok(StatusCode::NO_CONTENT)
}
