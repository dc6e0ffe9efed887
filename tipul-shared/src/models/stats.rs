/// Read-only aggregates for the dashboard and the yearly report
///
/// Time windows are computed by the caller (see [`crate::scheduling::LocalClock`])
/// and passed in as UTC bounds. Monthly bucketing shifts timestamps by the
/// configured UTC offset so months line up with the therapist's calendar.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

/// Headline numbers on the dashboard
#[derive(Debug, Clone, Default, Serialize, sqlx::FromRow)]
pub struct DashboardCounts {
    pub total_clients: i64,
    pub active_clients: i64,
    pub sessions_this_week: i64,
    pub sessions_this_month: i64,
    pub pending_payments: i64,
    pub pending_tasks: i64,
}

/// One month of the yearly report (month is 1-12)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct MonthlyRow {
    pub month: i32,
    pub completed_sessions: i64,
    pub income_cents: i64,
    pub new_clients: i64,
}

/// A labelled count, e.g. `("ONLINE", 12)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct DistributionRow {
    pub label: String,
    pub count: i64,
}

/// Dashboard counters for one therapist
pub async fn dashboard_counts(
    pool: &PgPool,
    therapist_id: Uuid,
    week: (DateTime<Utc>, DateTime<Utc>),
    month: (DateTime<Utc>, DateTime<Utc>),
) -> Result<DashboardCounts, sqlx::Error> {
    let counts = sqlx::query_as::<_, DashboardCounts>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM clients WHERE therapist_id = $1) AS total_clients,
            (SELECT COUNT(*) FROM clients WHERE therapist_id = $1 AND status = 'ACTIVE')
                AS active_clients,
            (SELECT COUNT(*) FROM therapy_sessions
              WHERE therapist_id = $1 AND start_time >= $2 AND start_time < $3)
                AS sessions_this_week,
            (SELECT COUNT(*) FROM therapy_sessions
              WHERE therapist_id = $1 AND start_time >= $4 AND start_time < $5)
                AS sessions_this_month,
            (SELECT COUNT(*) FROM payments p JOIN clients c ON c.id = p.client_id
              WHERE c.therapist_id = $1 AND p.status = 'PENDING') AS pending_payments,
            (SELECT COUNT(*) FROM tasks
              WHERE user_id = $1 AND status IN ('PENDING', 'IN_PROGRESS')) AS pending_tasks
        "#,
    )
    .bind(therapist_id)
    .bind(week.0)
    .bind(week.1)
    .bind(month.0)
    .bind(month.1)
    .fetch_one(pool)
    .await?;

    Ok(counts)
}

/// Twelve rows, one per month of the year bounded by `[year_start, year_end)`
pub async fn monthly_report(
    pool: &PgPool,
    therapist_id: Uuid,
    year_start: DateTime<Utc>,
    year_end: DateTime<Utc>,
    offset_minutes: i32,
) -> Result<Vec<MonthlyRow>, sqlx::Error> {
    let rows = sqlx::query_as::<_, MonthlyRow>(
        r#"
        WITH months AS (
            SELECT generate_series(1, 12) AS month
        ),
        s AS (
            SELECT EXTRACT(MONTH FROM ((start_time AT TIME ZONE 'UTC') + make_interval(mins => $4)))::int AS month,
                   COUNT(*) AS n
            FROM therapy_sessions
            WHERE therapist_id = $1 AND status = 'COMPLETED'
              AND start_time >= $2 AND start_time < $3
            GROUP BY 1
        ),
        p AS (
            SELECT EXTRACT(MONTH FROM ((p.paid_at AT TIME ZONE 'UTC') + make_interval(mins => $4)))::int AS month,
                   SUM(p.amount_cents)::bigint AS total
            FROM payments p
            JOIN clients c ON c.id = p.client_id
            WHERE c.therapist_id = $1 AND p.status = 'PAID'
              AND p.paid_at >= $2 AND p.paid_at < $3
            GROUP BY 1
        ),
        nc AS (
            SELECT EXTRACT(MONTH FROM ((created_at AT TIME ZONE 'UTC') + make_interval(mins => $4)))::int AS month,
                   COUNT(*) AS n
            FROM clients
            WHERE therapist_id = $1 AND created_at >= $2 AND created_at < $3
            GROUP BY 1
        )
        SELECT m.month,
               COALESCE(s.n, 0) AS completed_sessions,
               COALESCE(p.total, 0) AS income_cents,
               COALESCE(nc.n, 0) AS new_clients
        FROM months m
        LEFT JOIN s ON s.month = m.month
        LEFT JOIN p ON p.month = m.month
        LEFT JOIN nc ON nc.month = m.month
        ORDER BY m.month
        "#,
    )
    .bind(therapist_id)
    .bind(year_start)
    .bind(year_end)
    .bind(offset_minutes)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Recordings created in `[from, to)`
pub async fn count_recordings(
    pool: &PgPool,
    therapist_id: Uuid,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM recordings WHERE therapist_id = $1 AND created_at >= $2 AND created_at < $3",
    )
    .bind(therapist_id)
    .bind(from)
    .bind(to)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Session counts by type for sessions starting in `[from, to)`
pub async fn session_type_distribution(
    pool: &PgPool,
    therapist_id: Uuid,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<DistributionRow>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DistributionRow>(
        r#"
        SELECT session_type::text AS label, COUNT(*) AS count
        FROM therapy_sessions
        WHERE therapist_id = $1 AND start_time >= $2 AND start_time < $3
        GROUP BY session_type
        ORDER BY session_type
        "#,
    )
    .bind(therapist_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Client counts by status
pub async fn client_status_distribution(
    pool: &PgPool,
    therapist_id: Uuid,
) -> Result<Vec<DistributionRow>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DistributionRow>(
        r#"
        SELECT status::text AS label, COUNT(*) AS count
        FROM clients
        WHERE therapist_id = $1
        GROUP BY status
        ORDER BY status
        "#,
    )
    .bind(therapist_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
