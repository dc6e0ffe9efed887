//! 48-hour session reminders
//!
//! Runs hourly. The two-hour window overlaps the next run by an hour, so a
//! session can be reminded twice; this is accepted rather than tracked.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use tipul_shared::models::notification::{
    CreateNotification, Notification, NotificationStatus, NotificationType,
};
use tipul_shared::models::session::ReminderCandidate;
use tipul_shared::scheduling::{reminder_window, LocalClock};

use super::JobError;
use crate::mail::{templates, EmailMessage, Mailer};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReminderReport {
    /// Scheduled sessions in the window, with or without a client e-mail
    pub sessions_found: usize,
    pub emails_sent: usize,
    pub errors: Vec<String>,
}

fn sent_notification(candidate: &ReminderCandidate, clock: &LocalClock, now: DateTime<Utc>) -> CreateNotification {
    CreateNotification {
        user_id: candidate.therapist_id,
        notification_type: NotificationType::SessionReminder,
        title: format!("Reminder sent to {}", candidate.client_name),
        content: format!(
            "The reminder for the session on {} was sent successfully",
            clock.format_date(candidate.start_time)
        ),
        status: NotificationStatus::Sent,
        scheduled_for: None,
        sent_at: Some(now),
    }
}

/// E-mails every client with a scheduled session in `[now+47h, now+49h)`
///
/// Clients without an e-mail address are skipped. A failed send or a
/// failed notification insert is reported in `errors` and does not stop
/// the run.
pub async fn run_reminders(
    pool: &PgPool,
    mailer: &dyn Mailer,
    clock: &LocalClock,
    now: DateTime<Utc>,
) -> Result<ReminderReport, JobError> {
    let (from, to) = reminder_window(now);
    let candidates = ReminderCandidate::find_between(pool, from, to).await?;

    let mut report = ReminderReport {
        sessions_found: candidates.len(),
        ..Default::default()
    };

    for candidate in &candidates {
        let Some(email) = candidate
            .client_email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
        else {
            continue;
        };

        let rendered = templates::session_reminder(
            &candidate.client_name,
            &candidate.therapist_name,
            candidate.start_time,
            candidate.session_type,
            clock,
        );

        match mailer.send(&EmailMessage::from_rendered(email, rendered)).await {
            Ok(email_id) => {
                report.emails_sent += 1;
                tracing::info!(
                    session_id = %candidate.session_id,
                    email_id = %email_id,
                    "Session reminder sent"
                );

                if let Err(e) = Notification::create(pool, sent_notification(candidate, clock, now)).await {
                    tracing::error!(session_id = %candidate.session_id, error = %e, "Failed to record reminder notification");
                    report.errors.push(format!("Failed to record reminder for {}: {}", email, e));
                }
            }
            Err(e) => {
                tracing::warn!(session_id = %candidate.session_id, error = %e, "Session reminder failed");
                report.errors.push(format!("Failed to send to {}: {}", email, e));
            }
        }
    }

    tracing::info!(
        sessions_found = report.sessions_found,
        emails_sent = report.emails_sent,
        errors = report.errors.len(),
        "Session reminders processed"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tipul_shared::models::session::SessionType;
    use uuid::Uuid;

    #[test]
    fn test_sent_notification_is_marked_sent() {
        let start = Utc.with_ymd_and_hms(2025, 3, 6, 10, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 3, 4, 10, 30, 0).unwrap();
        let candidate = ReminderCandidate {
            session_id: Uuid::new_v4(),
            therapist_id: Uuid::new_v4(),
            therapist_name: "Dana".to_string(),
            client_name: "Noa".to_string(),
            client_email: Some("noa@example.com".to_string()),
            start_time: start,
            session_type: SessionType::InPerson,
        };

        let notification = sent_notification(&candidate, &LocalClock::utc(), now);

        assert_eq!(notification.user_id, candidate.therapist_id);
        assert_eq!(notification.status, NotificationStatus::Sent);
        assert_eq!(notification.sent_at, Some(now));
        assert_eq!(notification.title, "Reminder sent to Noa");
        assert!(notification.content.contains("06/03/2025"));
    }
}
