//! Notification digest
//!
//! For every user with an enabled notification setting, writes PENDING
//! in-app notifications scheduled for `now`. A failure for one user is
//! logged and collected; the remaining users are still processed.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use tipul_shared::models::notification::{CreateNotification, Notification, NotificationType};
use tipul_shared::models::notification_setting::{NotificationSetting, DEFAULT_DEBT_THRESHOLD_DAYS};
use tipul_shared::models::payment::{total_cents, Payment};
use tipul_shared::models::session::TherapySession;
use tipul_shared::models::task::Task;
use tipul_shared::scheduling::LocalClock;

use super::{format_amount, DigestParts, JobError};

/// Open tasks considered for the evening summary
const EVENING_TASK_LIMIT: i64 = 10;

/// Open tasks listed by title in the evening summary
const EVENING_TASKS_LISTED: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DigestReport {
    /// Notifications created
    pub count: usize,

    /// One line per user whose digest failed
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Title and body of one notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestMessage {
    pub title: String,
    pub content: String,
}

fn bullet_lines<'a>(
    sessions: impl IntoIterator<Item = (&'a str, DateTime<Utc>)>,
    clock: &LocalClock,
) -> String {
    sessions
        .into_iter()
        .map(|(client, start)| format!("• {} - {}", client, clock.format_time(start)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Today's sessions, or `None` when there are none
pub fn morning_summary<'a>(
    sessions: &[(&'a str, DateTime<Utc>)],
    clock: &LocalClock,
    now: DateTime<Utc>,
) -> Option<DigestMessage> {
    if sessions.is_empty() {
        return None;
    }

    Some(DigestMessage {
        title: format!("Morning summary - {}", clock.format_date(now)),
        content: format!(
            "You have {} sessions today:\n{}",
            sessions.len(),
            bullet_lines(sessions.iter().copied(), clock)
        ),
    })
}

/// Tomorrow's sessions and open tasks, or `None` when both are empty
///
/// `open_tasks` holds task titles, most urgent first; only the first five
/// are listed but the count covers all of them.
pub fn evening_summary<'a>(
    sessions: &[(&'a str, DateTime<Utc>)],
    open_tasks: &[&'a str],
    clock: &LocalClock,
    now: DateTime<Utc>,
) -> Option<DigestMessage> {
    if sessions.is_empty() && open_tasks.is_empty() {
        return None;
    }

    let session_list = if sessions.is_empty() {
        "No sessions".to_string()
    } else {
        bullet_lines(sessions.iter().copied(), clock)
    };

    let task_list = if open_tasks.is_empty() {
        "No tasks".to_string()
    } else {
        open_tasks
            .iter()
            .take(EVENING_TASKS_LISTED)
            .map(|t| format!("• {}", t))
            .collect::<Vec<_>>()
            .join("\n")
    };

    Some(DigestMessage {
        title: format!("Tomorrow - {}", clock.format_date(now + Duration::days(1))),
        content: format!(
            "Sessions tomorrow ({}):\n{}\n\nOpen tasks ({}):\n{}",
            sessions.len(),
            session_list,
            open_tasks.len(),
            task_list
        ),
    })
}

pub fn overdue_payments(count: usize, total: i64, threshold_days: i32) -> Option<DigestMessage> {
    (count > 0).then(|| DigestMessage {
        title: format!("Reminder: {} pending payments", count),
        content: format!(
            "{} payments have been pending for more than {} days, totalling {}",
            count,
            threshold_days,
            format_amount(total)
        ),
    })
}

pub fn monthly_reminder(count: usize, total: i64) -> Option<DigestMessage> {
    (count > 0).then(|| DigestMessage {
        title: "Monthly collection reminder".to_string(),
        content: format!(
            "The month is ending. {} payments are waiting to be collected, totalling {}",
            count,
            format_amount(total)
        ),
    })
}

fn threshold_days(setting: &NotificationSetting) -> i32 {
    if setting.debt_threshold_days > 0 {
        setting.debt_threshold_days
    } else {
        DEFAULT_DEBT_THRESHOLD_DAYS
    }
}

fn is_monthly_reminder_day(setting: &NotificationSetting, clock: &LocalClock, now: DateTime<Utc>) -> bool {
    match setting.monthly_reminder_day {
        Some(day) if day > 0 => clock.day_of_month(now) == day as u32,
        _ => false,
    }
}

async fn notify(
    pool: &PgPool,
    user_id: Uuid,
    notification_type: NotificationType,
    message: DigestMessage,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    Notification::create(
        pool,
        CreateNotification::pending(user_id, notification_type, message.title, message.content, now),
    )
    .await?;
    Ok(())
}

/// Writes the selected digest parts for one user
///
/// # Returns
///
/// Number of notifications created
pub async fn digest_for_user(
    pool: &PgPool,
    setting: &NotificationSetting,
    parts: DigestParts,
    clock: &LocalClock,
    now: DateTime<Utc>,
) -> Result<usize, sqlx::Error> {
    let user_id = setting.user_id;
    let mut created = 0;

    if parts.morning {
        let (from, to) = clock.today(now);
        let sessions = TherapySession::list_scheduled_between(pool, user_id, from, to).await?;
        let lines: Vec<_> = sessions
            .iter()
            .map(|s| (s.client_name.as_str(), s.session.start_time))
            .collect();

        if let Some(message) = morning_summary(&lines, clock, now) {
            notify(pool, user_id, NotificationType::MorningSummary, message, now).await?;
            created += 1;
        }
    }

    if parts.evening {
        let (from, to) = clock.tomorrow(now);
        let sessions = TherapySession::list_scheduled_between(pool, user_id, from, to).await?;
        let tasks = Task::list_open(pool, user_id, EVENING_TASK_LIMIT).await?;

        let lines: Vec<_> = sessions
            .iter()
            .map(|s| (s.client_name.as_str(), s.session.start_time))
            .collect();
        let titles: Vec<_> = tasks.iter().map(|t| t.title.as_str()).collect();

        if let Some(message) = evening_summary(&lines, &titles, clock, now) {
            notify(pool, user_id, NotificationType::EveningSummary, message, now).await?;
            created += 1;
        }
    }

    if parts.overdue_payments {
        let days = threshold_days(setting);
        let cutoff = now - Duration::days(days as i64);
        let pending = Payment::list_pending(pool, user_id, Some(cutoff)).await?;
        let total = total_cents(pending.iter().map(|p| &p.payment));

        if let Some(message) = overdue_payments(pending.len(), total, days) {
            notify(pool, user_id, NotificationType::PaymentReminder, message, now).await?;
            created += 1;
        }
    }

    if parts.monthly_reminder && is_monthly_reminder_day(setting, clock, now) {
        let pending = Payment::list_pending(pool, user_id, None).await?;
        let total = total_cents(pending.iter().map(|p| &p.payment));

        if let Some(message) = monthly_reminder(pending.len(), total) {
            notify(pool, user_id, NotificationType::PaymentReminder, message, now).await?;
            created += 1;
        }
    }

    Ok(created)
}

async fn run_parts(
    pool: &PgPool,
    parts: DigestParts,
    clock: &LocalClock,
    now: DateTime<Utc>,
) -> Result<DigestReport, JobError> {
    let settings = NotificationSetting::first_enabled_per_user(pool).await?;
    let mut report = DigestReport::default();

    tracing::info!(users = settings.len(), ?parts, "Running notification digest");

    for setting in &settings {
        match digest_for_user(pool, setting, parts, clock, now).await {
            Ok(created) => report.count += created,
            Err(e) => {
                tracing::error!(user_id = %setting.user_id, error = %e, "Digest failed for user");
                report.errors.push(format!("user {}: {}", setting.user_id, e));
            }
        }
    }

    tracing::info!(
        count = report.count,
        errors = report.errors.len(),
        "Notification digest finished"
    );

    Ok(report)
}

/// Full digest: morning, evening, overdue and monthly payment reminders
pub async fn run_digest(
    pool: &PgPool,
    clock: &LocalClock,
    now: DateTime<Utc>,
) -> Result<DigestReport, JobError> {
    run_parts(pool, DigestParts::FULL, clock, now).await
}

/// Evening summary and overdue payments only
pub async fn run_daily_summary(
    pool: &PgPool,
    clock: &LocalClock,
    now: DateTime<Utc>,
) -> Result<DigestReport, JobError> {
    run_parts(pool, DigestParts::DAILY_SUMMARY, clock, now).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 4, h, m, 0).unwrap()
    }

    #[test]
    fn test_morning_summary_skipped_without_sessions() {
        assert!(morning_summary(&[], &LocalClock::utc(), at(6, 0)).is_none());
    }

    #[test]
    fn test_morning_summary_lists_sessions_in_local_time() {
        let clock = LocalClock::from_offset_minutes(120).unwrap();
        let message = morning_summary(&[("Noa", at(8, 0)), ("Avi", at(10, 30))], &clock, at(5, 0))
            .unwrap();

        assert_eq!(message.title, "Morning summary - 04/03/2025");
        assert_eq!(
            message.content,
            "You have 2 sessions today:\n• Noa - 10:00\n• Avi - 12:30"
        );
    }

    #[test]
    fn test_evening_summary_with_tasks_only() {
        let tasks = ["a", "b", "c", "d", "e", "f", "g"];
        let message = evening_summary(&[], &tasks, &LocalClock::utc(), at(18, 0)).unwrap();

        assert_eq!(message.title, "Tomorrow - 05/03/2025");
        assert!(message.content.starts_with("Sessions tomorrow (0):\nNo sessions"));
        assert!(message.content.contains("Open tasks (7):"));
        assert!(message.content.contains("• e"));
        assert!(!message.content.contains("• f"));
    }

    #[test]
    fn test_evening_summary_skipped_when_empty() {
        assert!(evening_summary(&[], &[], &LocalClock::utc(), at(18, 0)).is_none());
    }

    #[test]
    fn test_payment_messages() {
        assert!(overdue_payments(0, 0, 30).is_none());
        assert!(monthly_reminder(0, 0).is_none());

        let overdue = overdue_payments(3, 90_000, 30).unwrap();
        assert_eq!(overdue.title, "Reminder: 3 pending payments");
        assert!(overdue.content.contains("more than 30 days"));
        assert!(overdue.content.contains("₪900"));

        let monthly = monthly_reminder(2, 45_050).unwrap();
        assert!(monthly.content.contains("₪450.50"));
    }
}
