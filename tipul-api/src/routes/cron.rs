/// Endpoints for an external scheduler
///
/// These run the same batch jobs as the `tipul-worker` binary and are
/// guarded by the `CRON_SECRET` bearer check instead of a user token.
///
/// # Endpoints
///
/// - `GET /v1/cron/notifications` - Full digest
/// - `GET /v1/cron/daily-summary` - Evening summary and overdue payments
/// - `GET /v1/cron/reminders` - Session reminder e-mails

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;
use tipul_worker::jobs::{self, DigestReport};

#[derive(Debug, Serialize)]
pub struct DigestResponse {
    pub message: String,

    #[serde(flatten)]
    pub report: DigestReport,
}

#[derive(Debug, Serialize)]
pub struct RemindersResponse {
    pub message: String,
    pub sessions_found: usize,
    pub emails_sent: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

fn digest_response(report: DigestReport) -> Json<DigestResponse> {
    Json(DigestResponse {
        message: "Notifications generated".to_string(),
        report,
    })
}

pub async fn notifications(State(state): State<AppState>) -> ApiResult<Json<DigestResponse>> {
    let report = jobs::run_digest(&state.db, &state.clock, Utc::now()).await?;
    Ok(digest_response(report))
}

pub async fn daily_summary(State(state): State<AppState>) -> ApiResult<Json<DigestResponse>> {
    let report = jobs::run_daily_summary(&state.db, &state.clock, Utc::now()).await?;
    Ok(digest_response(report))
}

pub async fn reminders(State(state): State<AppState>) -> ApiResult<Json<RemindersResponse>> {
    let report =
        jobs::run_reminders(&state.db, state.mailer.as_ref(), &state.clock, Utc::now()).await?;

    Ok(Json(RemindersResponse {
        message: "Reminders processed".to_string(),
        sessions_found: report.sessions_found,
        emails_sent: report.emails_sent,
        errors: Some(report.errors).filter(|e| !e.is_empty()),
    }))
}
