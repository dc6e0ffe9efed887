//! Resend HTTP delivery

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{check_recipient, EmailMessage, MailError, Mailer};
use crate::config::IntegrationsConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ResendMailer {
    client: Client,
    api_key: Option<String>,
    from: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: String,
}

impl ResendMailer {
    pub fn from_config(config: &IntegrationsConfig) -> Result<Self, MailError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            api_key: config.resend_api_key.clone(),
            from: config.email_from.clone(),
            base_url: config.resend_base_url.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn api_url(&self) -> String {
        format!("{}/emails", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, message: &EmailMessage) -> Result<String, MailError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(MailError::NotConfigured("RESEND_API_KEY"))?;
        check_recipient(&message.to)?;

        let body = json!({
            "from": self.from,
            "to": [message.to.trim()],
            "subject": message.subject,
            "html": message.html,
            "text": message.text,
        });

        let response = self
            .client
            .post(self.api_url())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Api { status, body });
        }

        let sent: SendResponse = response.json().await?;
        tracing::debug!(email_id = %sent.id, "Email accepted by Resend");

        Ok(sent.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(to: &str) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            subject: "s".to_string(),
            html: "<p>h</p>".to_string(),
            text: "h".to_string(),
        }
    }

    #[tokio::test]
    async fn test_missing_key_is_not_configured() {
        let mailer = ResendMailer::from_config(&IntegrationsConfig::default()).unwrap();
        assert!(!mailer.is_configured());

        let err = mailer.send(&message("noa@example.com")).await.unwrap_err();
        assert!(matches!(err, MailError::NotConfigured("RESEND_API_KEY")));
    }

    #[tokio::test]
    async fn test_invalid_recipient_rejected_before_request() {
        let config = IntegrationsConfig {
            resend_api_key: Some("re_test".to_string()),
            resend_base_url: "http://127.0.0.1:1".to_string(),
            ..Default::default()
        };
        let mailer = ResendMailer::from_config(&config).unwrap();

        let err = mailer.send(&message("not-an-address")).await.unwrap_err();
        assert!(matches!(err, MailError::InvalidRecipient(_)));
    }

    #[test]
    fn test_api_url() {
        let config = IntegrationsConfig {
            resend_base_url: "http://localhost:8025/".to_string(),
            ..Default::default()
        };
        let mailer = ResendMailer::from_config(&config).unwrap();
        assert_eq!(mailer.api_url(), "http://localhost:8025/emails");
    }
}
