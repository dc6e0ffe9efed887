//! Calendar arithmetic shared by the API and the batch jobs
//!
//! Everything here is pure: callers pass `now` in explicitly so the rules
//! can be tested without a clock or a database.
//!
//! - [`overlaps`]: the half-open interval test behind session conflicts
//! - [`LocalClock`]: "today", "this week" and "this month" in the practice's
//!   fixed UTC offset (weeks start on Sunday)
//! - [`plan_recurring_sessions`]: expands weekly patterns into concrete slots
//! - [`reminder_window`]: the `[now+47h, now+49h)` reminder window

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone,
    Utc,
};
use serde::Serialize;
use uuid::Uuid;

use crate::models::recurring_pattern::RecurringPattern;

/// Reminder e-mails go out for sessions starting this many hours from now…
pub const REMINDER_WINDOW_START_HOURS: i64 = 47;

/// …up to (but excluding) this many hours from now
pub const REMINDER_WINDOW_END_HOURS: i64 = 49;

/// Default number of weeks materialized by one apply call
pub const DEFAULT_WEEKS_AHEAD: u32 = 4;

/// True if `[a_start, a_end)` and `[b_start, b_end)` share any instant
///
/// Back-to-back intervals (one ends exactly when the other starts) do not
/// overlap.
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && a_end > b_start
}

/// Parses a strict `HH:MM` 24-hour time
pub fn parse_hhmm(value: &str) -> Option<NaiveTime> {
    if value.len() != 5 || value.as_bytes()[2] != b':' {
        return None;
    }
    NaiveTime::parse_from_str(value, "%H:%M").ok()
}

/// Returns the `[from, to)` window for the 48-hour session reminder
pub fn reminder_window(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (
        now + Duration::hours(REMINDER_WINDOW_START_HOURS),
        now + Duration::hours(REMINDER_WINDOW_END_HOURS),
    )
}

/// Calendar in a fixed UTC offset
#[derive(Debug, Clone, Copy)]
pub struct LocalClock {
    offset: FixedOffset,
}

impl Default for LocalClock {
    fn default() -> Self {
        Self::utc()
    }
}

impl LocalClock {
    pub fn utc() -> Self {
        Self {
            offset: Utc.fix(),
        }
    }

    /// Clock at `minutes` east of UTC; None outside ±24h
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes.checked_mul(60)?).map(|offset| Self { offset })
    }

    pub fn offset_minutes(&self) -> i32 {
        self.offset.local_minus_utc() / 60
    }

    /// Converts a local wall-clock time to UTC
    pub fn to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        Utc.from_utc_datetime(&(local - Duration::seconds(self.offset.local_minus_utc() as i64)))
    }

    /// The local calendar date at `now`
    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.offset).date_naive()
    }

    /// Local midnight of `date`, in UTC
    pub fn start_of(&self, date: NaiveDate) -> DateTime<Utc> {
        self.to_utc(date.and_time(NaiveTime::MIN))
    }

    /// `[today 00:00, tomorrow 00:00)`
    pub fn today(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let date = self.local_date(now);
        let start = self.start_of(date);
        (start, start + Duration::days(1))
    }

    /// `[tomorrow 00:00, day after 00:00)`
    pub fn tomorrow(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let (_, start) = self.today(now);
        (start, start + Duration::days(1))
    }

    /// Sunday 00:00 of the current week
    pub fn week_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let date = self.local_date(now);
        let back = date.weekday().num_days_from_sunday() as i64;
        self.start_of(date - Duration::days(back))
    }

    /// `[Sunday 00:00, next Sunday 00:00)`
    pub fn week(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.week_start(now);
        (start, start + Duration::weeks(1))
    }

    /// `[1st of this month 00:00, 1st of next month 00:00)`
    pub fn month(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let date = self.local_date(now);
        let first = date.with_day(1).unwrap_or(date);
        let next = if first.month() == 12 {
            NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
        }
        .unwrap_or(first + Duration::days(31));
        (self.start_of(first), self.start_of(next))
    }

    /// `[Jan 1 00:00, next Jan 1 00:00)` of `year`
    pub fn year(&self, year: i32) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = NaiveDate::from_ymd_opt(year, 1, 1)?;
        let next = NaiveDate::from_ymd_opt(year + 1, 1, 1)?;
        Some((self.start_of(first), self.start_of(next)))
    }

    /// Day of month (1-31) at `now`
    pub fn day_of_month(&self, now: DateTime<Utc>) -> u32 {
        self.local_date(now).day()
    }

    /// Calendar year at `now`
    pub fn current_year(&self, now: DateTime<Utc>) -> i32 {
        self.local_date(now).year()
    }

    /// Formats a UTC instant as local `HH:MM`
    pub fn format_time(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.offset).format("%H:%M").to_string()
    }

    /// Formats a UTC instant as local `DD/MM/YYYY`
    pub fn format_date(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.offset).format("%d/%m/%Y").to_string()
    }
}

/// A session the recurring generator wants to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedSession {
    pub pattern_id: Uuid,
    pub client_id: Uuid,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Expands active weekly patterns into concrete session slots
///
/// For week `w` in `0..weeks_ahead`, the slot of a pattern is
/// `week_start + w weeks + day_of_week days + time` (local). Slots are
/// skipped when the pattern is inactive or has no client, when its time or
/// weekday is malformed, or when the slot starts before `now`. Existing
/// sessions are not consulted here; the insert does that per slot.
///
/// Output is ordered by week, then by the input order of patterns.
pub fn plan_recurring_sessions(
    patterns: &[RecurringPattern],
    now: DateTime<Utc>,
    weeks_ahead: u32,
    clock: &LocalClock,
) -> Vec<PlannedSession> {
    let week_start_date = clock.local_date(clock.week_start(now));
    let mut planned = Vec::new();

    for week in 0..weeks_ahead as i64 {
        for pattern in patterns {
            if !pattern.is_active {
                continue;
            }
            let Some(client_id) = pattern.client_id else {
                continue;
            };
            if !(0..=6).contains(&pattern.day_of_week) || pattern.duration_minutes <= 0 {
                continue;
            }
            let Some(time) = parse_hhmm(&pattern.time) else {
                continue;
            };

            let date = week_start_date + Duration::weeks(week) + Duration::days(pattern.day_of_week as i64);
            let start = clock.to_utc(date.and_time(time));
            if start < now {
                continue;
            }

            planned.push(PlannedSession {
                pattern_id: pattern.id,
                client_id,
                start,
                end: start + Duration::minutes(pattern.duration_minutes as i64),
            });
        }
    }

    planned
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn pattern(day_of_week: i16, time: &str, client: Option<Uuid>) -> RecurringPattern {
        RecurringPattern {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            client_id: client,
            day_of_week,
            time: time.to_string(),
            duration_minutes: 50,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_overlaps() {
        let nine = utc("2025-01-15T09:00:00Z");
        let ten = utc("2025-01-15T10:00:00Z");
        let half_past_nine = utc("2025-01-15T09:30:00Z");
        let eleven = utc("2025-01-15T11:00:00Z");

        assert!(overlaps(nine, ten, half_past_nine, eleven));
        assert!(overlaps(half_past_nine, eleven, nine, ten));
        // Containment in both directions
        assert!(overlaps(nine, eleven, half_past_nine, ten));
        assert!(overlaps(half_past_nine, ten, nine, eleven));
        // Back-to-back
        assert!(!overlaps(nine, ten, ten, eleven));
        assert!(!overlaps(ten, eleven, nine, ten));
    }

    #[test]
    fn test_parse_hhmm() {
        assert_eq!(parse_hhmm("09:30"), NaiveTime::from_hms_opt(9, 30, 0));
        assert_eq!(parse_hhmm("23:59"), NaiveTime::from_hms_opt(23, 59, 0));
        assert!(parse_hhmm("9:30").is_none());
        assert!(parse_hhmm("24:00").is_none());
        assert!(parse_hhmm("12:60").is_none());
        assert!(parse_hhmm("1230").is_none());
    }

    #[test]
    fn test_reminder_window() {
        let now = utc("2025-01-15T10:00:00Z");
        let (from, to) = reminder_window(now);
        assert_eq!(from, utc("2025-01-17T09:00:00Z"));
        assert_eq!(to, utc("2025-01-17T11:00:00Z"));
    }

    #[test]
    fn test_week_starts_on_sunday() {
        let clock = LocalClock::utc();
        // Wednesday
        let now = utc("2025-01-15T10:00:00Z");
        assert_eq!(clock.week_start(now), utc("2025-01-12T00:00:00Z"));

        // Sunday itself
        let sunday = utc("2025-01-12T18:00:00Z");
        assert_eq!(clock.week_start(sunday), utc("2025-01-12T00:00:00Z"));
    }

    #[test]
    fn test_week_start_respects_offset() {
        // 23:30 UTC on Saturday is already 01:30 Sunday at UTC+2
        let clock = LocalClock::from_offset_minutes(120).unwrap();
        let now = utc("2025-01-11T23:30:00Z");
        assert_eq!(clock.week_start(now), utc("2025-01-11T22:00:00Z"));
        assert_eq!(clock.day_of_month(now), 12);
    }

    #[test]
    fn test_today_and_tomorrow() {
        let clock = LocalClock::utc();
        let now = utc("2025-03-31T15:00:00Z");
        assert_eq!(
            clock.today(now),
            (utc("2025-03-31T00:00:00Z"), utc("2025-04-01T00:00:00Z"))
        );
        assert_eq!(
            clock.tomorrow(now),
            (utc("2025-04-01T00:00:00Z"), utc("2025-04-02T00:00:00Z"))
        );
    }

    #[test]
    fn test_month_rolls_over_year() {
        let clock = LocalClock::utc();
        let now = utc("2024-12-20T12:00:00Z");
        assert_eq!(
            clock.month(now),
            (utc("2024-12-01T00:00:00Z"), utc("2025-01-01T00:00:00Z"))
        );
    }

    #[test]
    fn test_year_bounds_with_offset() {
        let clock = LocalClock::from_offset_minutes(120).unwrap();
        let (start, end) = clock.year(2025).unwrap();
        assert_eq!(start, utc("2024-12-31T22:00:00Z"));
        assert_eq!(end, utc("2025-12-31T22:00:00Z"));
    }

    #[test]
    fn test_invalid_offset_rejected() {
        assert!(LocalClock::from_offset_minutes(25 * 60).is_none());
        assert_eq!(LocalClock::from_offset_minutes(-300).unwrap().offset_minutes(), -300);
    }

    #[test]
    fn test_plan_skips_past_slots() {
        let clock = LocalClock::utc();
        let now = utc("2025-01-15T10:00:00Z"); // Wednesday
        let client = Uuid::new_v4();
        let wednesday_morning = pattern(3, "09:00", Some(client));
        let thursday = pattern(4, "10:00", Some(client));

        let planned = plan_recurring_sessions(
            &[wednesday_morning.clone(), thursday.clone()],
            now,
            2,
            &clock,
        );

        let starts: Vec<_> = planned.iter().map(|p| p.start).collect();
        assert_eq!(
            starts,
            vec![
                utc("2025-01-16T10:00:00Z"),
                utc("2025-01-22T09:00:00Z"),
                utc("2025-01-23T10:00:00Z"),
            ]
        );
        assert!(planned.iter().all(|p| p.start >= now));
        assert_eq!(planned[0].end, utc("2025-01-16T10:50:00Z"));
        assert_eq!(planned[1].pattern_id, wednesday_morning.id);
    }

    #[test]
    fn test_plan_skips_patterns_without_client_or_inactive() {
        let clock = LocalClock::utc();
        let now = utc("2025-01-12T00:00:00Z");
        let mut inactive = pattern(1, "10:00", Some(Uuid::new_v4()));
        inactive.is_active = false;
        let no_client = pattern(2, "10:00", None);
        let bad_time = pattern(3, "25:00", Some(Uuid::new_v4()));

        let planned = plan_recurring_sessions(&[inactive, no_client, bad_time], now, 4, &clock);
        assert!(planned.is_empty());
    }

    #[test]
    fn test_plan_local_time_is_converted_to_utc() {
        let clock = LocalClock::from_offset_minutes(180).unwrap();
        let now = utc("2025-06-01T00:00:00Z"); // Sunday
        let monday = pattern(1, "16:00", Some(Uuid::new_v4()));

        let planned = plan_recurring_sessions(&[monday], now, 1, &clock);
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].start, utc("2025-06-02T13:00:00Z"));
    }

    #[test]
    fn test_plan_zero_weeks_is_empty() {
        let clock = LocalClock::utc();
        let planned = plan_recurring_sessions(
            &[pattern(1, "10:00", Some(Uuid::new_v4()))],
            utc("2025-01-12T00:00:00Z"),
            0,
            &clock,
        );
        assert!(planned.is_empty());
    }
}
