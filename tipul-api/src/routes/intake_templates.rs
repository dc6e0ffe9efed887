/// Intake questionnaire templates
///
/// - `GET /v1/intake-templates` - Newest first
/// - `POST /v1/intake-templates` - `{name, questions, is_default?}`; a new
///   default replaces the previous one

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tipul_shared::{auth::middleware::AuthContext, models::intake_template::IntakeTemplate};

#[derive(Debug, Deserialize)]
pub struct CreateTemplateRequest {
    pub name: String,

    /// Question list, stored as given
    pub questions: JsonValue,

    #[serde(default)]
    pub is_default: bool,
}

pub async fn list_templates(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<IntakeTemplate>>> {
    let templates = IntakeTemplate::list(&state.db, auth.user_id).await?;
    Ok(Json(templates))
}

pub async fn create_template(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateTemplateRequest>,
) -> ApiResult<(StatusCode, Json<IntakeTemplate>)> {
    if req.name.trim().is_empty() {
        return Err(ApiError::invalid("name", "Name is required"));
    }
    if !req.questions.is_array() {
        return Err(ApiError::invalid("questions", "Questions must be a list"));
    }

    let template =
        IntakeTemplate::create(&state.db, auth.user_id, &req.name, req.questions, req.is_default)
            .await?;

    Ok((StatusCode::CREATED, Json(template)))
}
