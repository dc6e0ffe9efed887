/// Dashboard and yearly report
///
/// - `GET /v1/dashboard` - Headline counters, today's sessions and the
///   five most recent recordings
/// - `GET /v1/reports?year` - Monthly breakdown, yearly totals and
///   distributions; defaults to the current year

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tipul_shared::{
    auth::middleware::AuthContext,
    models::{
        recording::{Recording, RecordingListItem},
        session::{SessionListItem, TherapySession},
        stats::{self, DashboardCounts, DistributionRow, MonthlyRow},
    },
};

const RECENT_RECORDINGS: i64 = 5;

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    #[serde(flatten)]
    pub counts: DashboardCounts,
    pub today_sessions: Vec<SessionListItem>,
    pub recent_recordings: Vec<RecordingListItem>,
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub year: Option<i32>,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct YearTotals {
    pub new_clients: i64,
    pub completed_sessions: i64,
    pub income_cents: i64,
    pub recordings: i64,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub year: i32,
    pub monthly: Vec<MonthlyRow>,
    pub totals: YearTotals,
    pub session_types: Vec<DistributionRow>,
    pub client_statuses: Vec<DistributionRow>,
}

/// Sums the monthly rows; recordings are counted separately
fn sum_months(rows: &[MonthlyRow]) -> YearTotals {
    rows.iter().fold(YearTotals::default(), |mut acc, row| {
        acc.new_clients += row.new_clients;
        acc.completed_sessions += row.completed_sessions;
        acc.income_cents += row.income_cents;
        acc
    })
}

pub async fn dashboard(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<DashboardResponse>> {
    let now = Utc::now();
    let clock = &state.clock;

    let counts =
        stats::dashboard_counts(&state.db, auth.user_id, clock.week(now), clock.month(now)).await?;

    let (from, to) = clock.today(now);
    let today_sessions =
        TherapySession::list_scheduled_between(&state.db, auth.user_id, from, to).await?;

    let recent_recordings =
        Recording::list(&state.db, auth.user_id, None, Some(RECENT_RECORDINGS)).await?;

    Ok(Json(DashboardResponse {
        counts,
        today_sessions,
        recent_recordings,
    }))
}

pub async fn reports(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Json<ReportResponse>> {
    let clock = &state.clock;
    let year = query.year.unwrap_or_else(|| clock.current_year(Utc::now()));
    let (from, to) = clock
        .year(year)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid year: {}", year)))?;

    let monthly =
        stats::monthly_report(&state.db, auth.user_id, from, to, clock.offset_minutes()).await?;

    let mut totals = sum_months(&monthly);
    totals.recordings = stats::count_recordings(&state.db, auth.user_id, from, to).await?;

    let session_types =
        stats::session_type_distribution(&state.db, auth.user_id, from, to).await?;
    let client_statuses = stats::client_status_distribution(&state.db, auth.user_id).await?;

    Ok(Json(ReportResponse {
        year,
        monthly,
        totals,
        session_types,
        client_statuses,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(month: i32, sessions: i64, income: i64, clients: i64) -> MonthlyRow {
        MonthlyRow {
            month,
            completed_sessions: sessions,
            income_cents: income,
            new_clients: clients,
        }
    }

    #[test]
    fn test_sum_months() {
        let totals = sum_months(&[row(1, 4, 120_000, 1), row(2, 0, 0, 0), row(3, 6, 180_000, 2)]);
        assert_eq!(
            totals,
            YearTotals {
                new_clients: 3,
                completed_sessions: 10,
                income_cents: 300_000,
                recordings: 0,
            }
        );
    }

    #[test]
    fn test_sum_months_empty() {
        assert_eq!(sum_months(&[]), YearTotals::default());
    }
}
