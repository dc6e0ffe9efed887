/// The therapist's task list
///
/// Tasks are mostly opened by the system (session summaries, payments to
/// collect, transcripts to review) and closed from here or by the action
/// they ask for.
///
/// # Endpoints
///
/// - `GET /v1/tasks?status` - Most urgent first
/// - `PUT /v1/tasks/:id` - Change status, priority or due date

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tipul_shared::{
    auth::middleware::AuthContext,
    models::task::{Task, TaskPriority, TaskStatus, UpdateTask},
};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct TaskQuery {
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<TaskQuery>,
) -> ApiResult<Json<Vec<Task>>> {
    let tasks = Task::list(&state.db, auth.user_id, query.status).await?;
    Ok(Json(tasks))
}

/// Updates a task
///
/// Status changes must follow the task lifecycle; setting the current
/// status again is accepted.
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    let task = Task::find_owned(&state.db, id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    if let Some(target) = req.status {
        if target != task.status && !task.status.can_transition_to(target) {
            return Err(ApiError::BadRequest(format!(
                "Cannot move task from {} to {}",
                task.status.as_str(),
                target.as_str()
            )));
        }
    }

    let update = UpdateTask {
        status: req.status,
        priority: req.priority,
        due_date: req.due_date.map(Some),
    };

    let task = Task::update(&state.db, id, auth.user_id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    Ok(Json(task))
}
