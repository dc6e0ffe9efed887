//! Outbound e-mail
//!
//! [`Mailer`] is the seam; [`ResendMailer`] delivers through the Resend HTTP
//! API and [`MemoryMailer`] keeps messages in memory for tests. Message
//! bodies come from [`templates`].
//!
//! # Example
//!
//! ```no_run
//! use tipul_worker::config::IntegrationsConfig;
//! use tipul_worker::mail::{templates, EmailMessage, Mailer, ResendMailer};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mailer = ResendMailer::from_config(&IntegrationsConfig::from_env())?;
//! let rendered = templates::generic_message("Noa", "Schedule change", "See you Tuesday", "Dana");
//! mailer.send(&EmailMessage::from_rendered("noa@example.com", rendered)).await?;
//! # Ok(())
//! # }
//! ```

pub mod memory;
pub mod resend;
pub mod templates;

use async_trait::async_trait;
use serde::Serialize;

pub use memory::MemoryMailer;
pub use resend::ResendMailer;
pub use templates::RenderedEmail;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Resend API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

impl EmailMessage {
    /// Message with a plain-text body derived from the HTML
    pub fn from_rendered(to: impl Into<String>, rendered: RenderedEmail) -> Self {
        let text = templates::strip_tags(&rendered.html);

        Self {
            to: to.into(),
            subject: rendered.subject,
            html: rendered.html,
            text,
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends one message and returns the provider's message id
    async fn send(&self, message: &EmailMessage) -> Result<String, MailError>;
}

/// Rejects obviously unusable recipients before calling the provider
pub(crate) fn check_recipient(to: &str) -> Result<(), MailError> {
    let trimmed = to.trim();
    match trimmed.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(MailError::InvalidRecipient(trimmed.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rendered_strips_tags() {
        let message = EmailMessage::from_rendered(
            "noa@example.com",
            RenderedEmail {
                subject: "Hi".to_string(),
                html: "<p>Hello <strong>Noa</strong></p>".to_string(),
            },
        );

        assert_eq!(message.text, "Hello Noa");
        assert_eq!(message.html, "<p>Hello <strong>Noa</strong></p>");
    }

    #[test]
    fn test_check_recipient() {
        assert!(check_recipient("noa@example.com").is_ok());
        assert!(check_recipient("noa@localhost").is_err());
        assert!(check_recipient("@example.com").is_err());
        assert!(check_recipient("").is_err());
    }
}
