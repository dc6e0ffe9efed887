/// Free-form e-mail from the therapist to a client
///
/// `POST /v1/email/send` `{client_id, subject, content}` renders the
/// generic template and sends it through the configured mailer.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::clients::owned_client,
};
use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use tipul_shared::{auth::middleware::AuthContext, models::user::User};
use tipul_worker::mail::{templates, EmailMessage};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct SendEmailRequest {
    pub client_id: Uuid,

    #[validate(length(min = 1, max = 200, message = "Subject is required"))]
    pub subject: String,

    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct SendEmailResponse {
    pub message: String,

    /// Provider message id
    pub id: String,
}

pub async fn send_email(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<SendEmailRequest>,
) -> ApiResult<Json<SendEmailResponse>> {
    req.validate()?;

    let client = owned_client(&state, &auth, req.client_id).await?;
    let to = client
        .email
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("Client has no email address".to_string()))?;

    let therapist = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let rendered = templates::generic_message(&client.name, &req.subject, &req.content, &therapist.name);
    let id = state.mailer.send(&EmailMessage::from_rendered(to, rendered)).await?;

    tracing::info!(client_id = %client.id, message_id = %id, "Email sent to client");

    Ok(Json(SendEmailResponse {
        message: "Email sent".to_string(),
        id,
    }))
}
