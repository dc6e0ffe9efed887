/// Weekly recurring patterns and their expansion into sessions
///
/// # Endpoints
///
/// - `GET /v1/recurring-patterns`, `POST /v1/recurring-patterns`
/// - `PUT /v1/recurring-patterns/:id`, `DELETE /v1/recurring-patterns/:id`
/// - `POST /v1/recurring-patterns/apply` - Create sessions for the coming weeks
///
/// Applying is idempotent per slot: a slot that already has a session
/// starting at the same instant is skipped, so applying twice creates
/// nothing the second time.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::clients::owned_client,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use tipul_shared::{
    auth::middleware::AuthContext,
    models::{
        recurring_pattern::{
            CreateRecurringPattern, RecurringPattern, RecurringPatternListItem,
            UpdateRecurringPattern, DEFAULT_DURATION_MINUTES,
        },
        session::{TherapySession, DEFAULT_SESSION_PRICE_CENTS},
    },
    scheduling::{parse_hhmm, plan_recurring_sessions, DEFAULT_WEEKS_AHEAD},
};
use uuid::Uuid;

pub const MAX_WEEKS_AHEAD: u32 = 52;

/// Distinguishes an explicit `null` from an absent field
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
pub struct CreatePatternRequest {
    pub day_of_week: i16,
    pub time: String,
    #[serde(alias = "duration_minutes")]
    pub duration: Option<i32>,
    pub client_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePatternRequest {
    #[serde(default, deserialize_with = "double_option")]
    pub client_id: Option<Option<Uuid>>,
    pub day_of_week: Option<i16>,
    pub time: Option<String>,
    #[serde(alias = "duration_minutes")]
    pub duration: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApplyRequest {
    #[serde(alias = "weeksAhead")]
    pub weeks_ahead: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ApplyResponse {
    pub message: String,
    pub created: usize,
}

fn pattern_not_found() -> ApiError {
    ApiError::NotFound("Pattern not found".to_string())
}

fn check_day(day_of_week: i16) -> ApiResult<()> {
    if !(0..=6).contains(&day_of_week) {
        return Err(ApiError::invalid("day_of_week", "Day must be between 0 (Sunday) and 6"));
    }
    Ok(())
}

fn check_time(time: &str) -> ApiResult<()> {
    if parse_hhmm(time).is_none() {
        return Err(ApiError::invalid("time", "Time must be HH:MM"));
    }
    Ok(())
}

fn check_duration(minutes: i32) -> ApiResult<()> {
    if minutes <= 0 {
        return Err(ApiError::invalid("duration", "Duration must be positive"));
    }
    Ok(())
}

fn weeks_ahead(requested: Option<u32>) -> u32 {
    requested
        .filter(|w| *w > 0)
        .unwrap_or(DEFAULT_WEEKS_AHEAD)
        .min(MAX_WEEKS_AHEAD)
}

/// Price for generated sessions; a missing or zero latest price falls back to the default
fn recurring_price(latest: Option<i64>) -> i64 {
    latest
        .filter(|p| *p > 0)
        .unwrap_or(DEFAULT_SESSION_PRICE_CENTS)
}

pub async fn list_patterns(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<RecurringPatternListItem>>> {
    let patterns = RecurringPattern::list(&state.db, auth.user_id).await?;
    Ok(Json(patterns))
}

pub async fn create_pattern(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreatePatternRequest>,
) -> ApiResult<(StatusCode, Json<RecurringPattern>)> {
    check_day(req.day_of_week)?;
    check_time(&req.time)?;
    let duration_minutes = req.duration.unwrap_or(DEFAULT_DURATION_MINUTES);
    check_duration(duration_minutes)?;

    if let Some(client_id) = req.client_id {
        owned_client(&state, &auth, client_id).await?;
    }

    let pattern = RecurringPattern::create(
        &state.db,
        auth.user_id,
        CreateRecurringPattern {
            client_id: req.client_id,
            day_of_week: req.day_of_week,
            time: req.time,
            duration_minutes,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(pattern)))
}

pub async fn update_pattern(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePatternRequest>,
) -> ApiResult<Json<RecurringPattern>> {
    if let Some(day) = req.day_of_week {
        check_day(day)?;
    }
    if let Some(time) = &req.time {
        check_time(time)?;
    }
    if let Some(minutes) = req.duration {
        check_duration(minutes)?;
    }
    if let Some(Some(client_id)) = req.client_id {
        owned_client(&state, &auth, client_id).await?;
    }

    let update = UpdateRecurringPattern {
        client_id: req.client_id,
        day_of_week: req.day_of_week,
        time: req.time,
        duration_minutes: req.duration,
        is_active: req.is_active,
    };

    let pattern = RecurringPattern::update(&state.db, id, auth.user_id, update)
        .await?
        .ok_or_else(pattern_not_found)?;

    Ok(Json(pattern))
}

pub async fn delete_pattern(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !RecurringPattern::delete(&state.db, id, auth.user_id).await? {
        return Err(pattern_not_found());
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Creates `SCHEDULED` sessions from the active patterns
///
/// Sessions are priced like the therapist's most recently created session,
/// or at the default price when that one was free.
/// Each slot is checked and inserted in one statement.
pub async fn apply_patterns(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    body: Option<Json<ApplyRequest>>,
) -> ApiResult<Json<ApplyResponse>> {
    let Json(req) = body.unwrap_or_default();
    let weeks = weeks_ahead(req.weeks_ahead);

    let patterns = RecurringPattern::list_active(&state.db, auth.user_id).await?;
    if patterns.is_empty() {
        return Ok(Json(ApplyResponse {
            message: "No active patterns".to_string(),
            created: 0,
        }));
    }

    let price_cents = recurring_price(TherapySession::latest_price(&state.db, auth.user_id).await?);

    let planned = plan_recurring_sessions(&patterns, Utc::now(), weeks, &state.clock);

    let mut created = 0;
    for slot in &planned {
        let inserted = TherapySession::create_recurring_if_free(
            &state.db,
            auth.user_id,
            slot.client_id,
            slot.start,
            slot.end,
            price_cents,
        )
        .await?;

        if inserted.is_some() {
            created += 1;
        }
    }

    tracing::info!(
        therapist_id = %auth.user_id,
        weeks,
        planned = planned.len(),
        created,
        "Applied recurring patterns"
    );

    Ok(Json(ApplyResponse {
        message: format!("{} sessions created", created),
        created,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weeks_ahead_bounds() {
        assert_eq!(weeks_ahead(None), DEFAULT_WEEKS_AHEAD);
        assert_eq!(weeks_ahead(Some(0)), DEFAULT_WEEKS_AHEAD);
        assert_eq!(weeks_ahead(Some(8)), 8);
        assert_eq!(weeks_ahead(Some(500)), MAX_WEEKS_AHEAD);
    }

    #[test]
    fn test_recurring_price_falls_back_when_free() {
        assert_eq!(recurring_price(Some(45_000)), 45_000);
        assert_eq!(recurring_price(Some(0)), DEFAULT_SESSION_PRICE_CENTS);
        assert_eq!(recurring_price(None), DEFAULT_SESSION_PRICE_CENTS);
    }

    #[test]
    fn test_update_request_null_client_clears() {
        let clear: UpdatePatternRequest =
            serde_json::from_value(serde_json::json!({ "client_id": null })).unwrap();
        assert_eq!(clear.client_id, Some(None));

        let untouched: UpdatePatternRequest =
            serde_json::from_value(serde_json::json!({ "time": "09:30" })).unwrap();
        assert_eq!(untouched.client_id, None);
    }

    #[test]
    fn test_pattern_field_checks() {
        assert!(check_day(0).is_ok());
        assert!(check_day(6).is_ok());
        assert!(check_day(7).is_err());
        assert!(check_time("09:00").is_ok());
        assert!(check_time("9:00").is_err());
        assert!(check_duration(0).is_err());
    }
}
