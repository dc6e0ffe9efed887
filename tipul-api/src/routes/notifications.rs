/// In-app notifications
///
/// # Endpoints
///
/// - `GET /v1/notifications?status&limit` - Newest first, 20 by default, at most 100
/// - `PUT /v1/notifications` - `{mark_all_as_read: true}` or `{id, status}`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tipul_shared::{
    auth::middleware::AuthContext,
    models::notification::{Notification, NotificationStatus},
};
use uuid::Uuid;

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    pub status: Option<NotificationStatus>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateNotificationsRequest {
    #[serde(default)]
    pub mark_all_as_read: bool,
    pub id: Option<Uuid>,
    pub status: Option<NotificationStatus>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum UpdateNotificationsResponse {
    AllRead { message: String, updated: u64 },
    One(Notification),
}

/// Clamps a requested page size into `1..=MAX_LIMIT`
fn page_limit(requested: Option<i64>) -> i64 {
    requested.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<NotificationQuery>,
) -> ApiResult<Json<Vec<Notification>>> {
    let notifications =
        Notification::list(&state.db, auth.user_id, query.status, page_limit(query.limit)).await?;

    Ok(Json(notifications))
}

pub async fn update_notifications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateNotificationsRequest>,
) -> ApiResult<Json<UpdateNotificationsResponse>> {
    if req.mark_all_as_read {
        let updated = Notification::mark_all_read(&state.db, auth.user_id).await?;
        return Ok(Json(UpdateNotificationsResponse::AllRead {
            message: "All notifications marked as read".to_string(),
            updated,
        }));
    }

    let (Some(id), Some(status)) = (req.id, req.status) else {
        return Err(ApiError::BadRequest(
            "Either mark_all_as_read or id and status are required".to_string(),
        ));
    };

    let notification = Notification::set_status(&state.db, id, auth.user_id, status)
        .await?
        .ok_or_else(|| ApiError::NotFound("Notification not found".to_string()))?;

    Ok(Json(UpdateNotificationsResponse::One(notification)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_limit() {
        assert_eq!(page_limit(None), DEFAULT_LIMIT);
        assert_eq!(page_limit(Some(5)), 5);
        assert_eq!(page_limit(Some(500)), MAX_LIMIT);
        assert_eq!(page_limit(Some(0)), 1);
    }
}
