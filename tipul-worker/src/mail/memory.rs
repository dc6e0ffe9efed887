//! In-memory mailer for tests and local runs without a Resend key

use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use super::{check_recipient, EmailMessage, MailError, Mailer};

#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<EmailMessage>>,
    fail: bool,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mailer whose every send fails with an API error
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, message: &EmailMessage) -> Result<String, MailError> {
        check_recipient(&message.to)?;

        if self.fail {
            return Err(MailError::Api {
                status: 503,
                body: "memory mailer configured to fail".to_string(),
            });
        }

        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message.clone());
        }

        Ok(Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_messages() {
        let mailer = MemoryMailer::new();
        let message = EmailMessage {
            to: "noa@example.com".to_string(),
            subject: "s".to_string(),
            html: "h".to_string(),
            text: "h".to_string(),
        };

        mailer.send(&message).await.unwrap();
        assert_eq!(mailer.sent(), vec![message.clone()]);

        assert!(MemoryMailer::failing().send(&message).await.is_err());
    }
}
