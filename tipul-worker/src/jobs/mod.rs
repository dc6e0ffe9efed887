/// Notification batch jobs
///
/// Both jobs take `now` and a [`LocalClock`](tipul_shared::scheduling::LocalClock)
/// from the caller, so the API's cron endpoints and the scheduler binary
/// run exactly the same code.
///
/// - [`digest`]: morning/evening summaries and payment reminders as in-app
///   notifications
/// - [`reminders`]: e-mail reminders for sessions starting in 47 to 49 hours

pub mod digest;
pub mod reminders;

use serde::Serialize;

pub use digest::{run_daily_summary, run_digest, DigestReport};
pub use reminders::{run_reminders, ReminderReport};

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Which parts of the digest to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DigestParts {
    pub morning: bool,
    pub evening: bool,
    pub overdue_payments: bool,
    pub monthly_reminder: bool,
}

impl DigestParts {
    pub const FULL: DigestParts = DigestParts {
        morning: true,
        evening: true,
        overdue_payments: true,
        monthly_reminder: true,
    };

    pub const DAILY_SUMMARY: DigestParts = DigestParts {
        morning: false,
        evening: true,
        overdue_payments: true,
        monthly_reminder: false,
    };
}

/// Formats minor units as shekels, dropping `.00`
pub fn format_amount(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    let whole = (cents / 100).to_string();

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    match cents % 100 {
        0 => format!("{sign}₪{grouped}"),
        fraction => format!("{sign}₪{grouped}.{fraction:02}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0), "₪0");
        assert_eq!(format_amount(30_000), "₪300");
        assert_eq!(format_amount(123_456_789), "₪1,234,567.89");
        assert_eq!(format_amount(100_005), "₪1,000.05");
        assert_eq!(format_amount(-2_500), "-₪25");
    }

    #[test]
    fn test_daily_summary_parts() {
        let parts = DigestParts::DAILY_SUMMARY;
        assert!(!parts.morning);
        assert!(parts.evening);
        assert!(parts.overdue_payments);
        assert!(!parts.monthly_reminder);
    }
}
