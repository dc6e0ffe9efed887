//! E-mail bodies
//!
//! Every interpolated value is HTML-escaped. Line breaks in free-text
//! content are kept through `white-space: pre-wrap`.

use chrono::{DateTime, Datelike, Utc, Weekday};
use tipul_shared::models::session::SessionType;
use tipul_shared::scheduling::LocalClock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Plain-text rendition of an HTML body
///
/// Drops tags, decodes the entities [`escape_html`] produces and trims
/// each line.
pub fn strip_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;

    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }

    let decoded = text
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");

    decoded
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "Sunday",
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
    }
}

fn layout(greeting_name: &str, body: &str, signature: &str) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
  <h2 style="color: #333;">Hello {name},</h2>
  {body}
  <p style="color: #666; font-size: 14px; margin-top: 30px;">Best regards,<br/>{signature}</p>
</div>"#,
        name = escape_html(greeting_name),
        body = body,
        signature = escape_html(signature),
    )
}

/// Reminder sent to a client ahead of a session
pub fn session_reminder(
    client_name: &str,
    therapist_name: &str,
    start: DateTime<Utc>,
    session_type: SessionType,
    clock: &LocalClock,
) -> RenderedEmail {
    let weekday = weekday_name(clock.local_date(start).weekday());
    let date = clock.format_date(start);
    let time = clock.format_time(start);

    let body = format!(
        r#"<p>This is a reminder of your upcoming session:</p>
  <div style="background: #f5f5f5; padding: 20px; border-radius: 8px; margin: 20px 0;">
    <p><strong>Date:</strong> {weekday}, {date}</p>
    <p><strong>Time:</strong> {time}</p>
    <p><strong>Session type:</strong> {label}</p>
    <p><strong>Therapist:</strong> {therapist}</p>
  </div>
  <p>If anything changes, please let us know as soon as possible.</p>"#,
        label = session_type.label(),
        therapist = escape_html(therapist_name),
    );

    RenderedEmail {
        subject: format!("Reminder: session with {} on {}, {}", therapist_name, weekday, date),
        html: layout(client_name, &body, therapist_name),
    }
}

/// Free-form message from a therapist to a client
pub fn generic_message(
    recipient_name: &str,
    subject: &str,
    content: &str,
    sender_name: &str,
) -> RenderedEmail {
    let body = format!(
        r#"<div style="white-space: pre-wrap; line-height: 1.6;">{}</div>"#,
        escape_html(content)
    );

    RenderedEmail {
        subject: subject.to_string(),
        html: layout(recipient_name, &body, sender_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<script>alert("x & y")</script>"#),
            "&lt;script&gt;alert(&quot;x &amp; y&quot;)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_strip_tags_round_trips_escaped_text() {
        let html = format!("<p>{}</p>", escape_html("a < b & c"));
        assert_eq!(strip_tags(&html), "a < b & c");
    }

    #[test]
    fn test_session_reminder_content() {
        // 2025-03-04 was a Tuesday
        let start = Utc.with_ymd_and_hms(2025, 3, 4, 14, 30, 0).unwrap();
        let clock = LocalClock::from_offset_minutes(120).unwrap();

        let email = session_reminder("Noa", "Dana Levi", start, SessionType::Online, &clock);

        assert!(email.subject.contains("Dana Levi"));
        assert!(email.subject.contains("Tuesday, 04/03/2025"));
        assert!(email.html.contains("16:30"));
        assert!(email.html.contains("online"));
        assert!(email.html.contains("Hello Noa"));
    }

    #[test]
    fn test_generic_message_escapes_content() {
        let email = generic_message("Noa", "Update", "Line one\n<b>bold?</b>", "Dana");

        assert_eq!(email.subject, "Update");
        assert!(email.html.contains("Line one\n&lt;b&gt;bold?&lt;/b&gt;"));
        assert!(email.html.contains("pre-wrap"));
        assert!(!email.html.contains("<b>bold?</b>"));
    }
}
