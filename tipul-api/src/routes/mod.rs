/// API route handlers
///
/// Handlers are grouped by resource. Every handler under `/v1` except
/// `auth` and `cron` runs behind the JWT layer and scopes its queries to
/// the authenticated therapist.

pub mod ai;
pub mod auth;
pub mod clients;
pub mod cron;
pub mod dashboard;
pub mod documents;
pub mod email;
pub mod health;
pub mod intake_templates;
pub mod notifications;
pub mod payments;
pub mod recordings;
pub mod recurring;
pub mod sessions;
pub mod tasks;
pub mod uploads;
pub mod user;
