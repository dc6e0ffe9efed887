/// Database models for Tipul
///
/// Each module holds one table's row type, its input structs and its CRUD
/// operations. Every owner-scoped lookup takes the therapist's user id and
/// returns `None` for rows belonging to someone else.
///
/// # Models
///
/// - `user`: therapist accounts
/// - `client`: the therapist's clients
/// - `session`: therapy sessions and the overlap query
/// - `session_note`: one note per session
/// - `payment`: payments per client/session
/// - `recording`, `transcription`, `analysis`: audio and its AI outputs
/// - `document`: uploaded forms and reports
/// - `task`: the therapist's follow-up list
/// - `notification`, `notification_setting`: in-app notifications and preferences
/// - `recurring_pattern`: weekly schedule templates
/// - `intake_template`: intake questionnaires
/// - `stats`: dashboard and report aggregates

pub mod analysis;
pub mod client;
pub mod document;
pub mod intake_template;
pub mod notification;
pub mod notification_setting;
pub mod payment;
pub mod recording;
pub mod recurring_pattern;
pub mod session;
pub mod session_note;
pub mod stats;
pub mod task;
pub mod transcription;
pub mod user;

/// Trims an optional string, mapping blank input to `None`
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_optional() {
        assert_eq!(normalize_optional(None), None);
        assert_eq!(normalize_optional(Some("   ".to_string())), None);
        assert_eq!(
            normalize_optional(Some("  050-1234567 ".to_string())),
            Some("050-1234567".to_string())
        );
    }
}
