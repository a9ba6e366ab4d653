//! Email delivery backends.

use std::sync::Arc;

use async_trait::async_trait;
use relay_config::EmailConfig;
use serde::{Deserialize, Serialize};

use crate::error::MailError;

/// A rendered plain-text email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait EmailTransport: Send + Sync {
    /// Deliver one message.
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Sends through a Resend-compatible HTTP API
/// (`POST {from, to: [..], subject, text}` with a bearer key).
#[derive(Debug, Clone)]
pub struct ResendTransport {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl ResendTransport {
    #[must_use]
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            api_key: api_key.into(),
            from: from.into(),
        }
    }

    fn payload(&self, message: &EmailMessage) -> serde_json::Value {
        serde_json::json!({
            "from": self.from,
            "to": [message.to],
            "subject": message.subject,
            "text": message.body,
        })
    }
}

#[async_trait]
impl EmailTransport for ResendTransport {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let resp = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&self.payload(message))
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        if resp.status().is_success() {
            return Ok(());
        }
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Err(MailError::Rejected { status, body })
    }

    fn name(&self) -> &'static str {
        "resend"
    }
}

/// Logs messages instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

#[async_trait]
impl EmailTransport for LogTransport {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            body_len = message.body.len(),
            "email (not sent: provider not configured)"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// The provider transport when configured, otherwise [`LogTransport`].
#[must_use]
pub fn from_config(config: &EmailConfig) -> Arc<dyn EmailTransport> {
    if config.is_configured() {
        Arc::new(ResendTransport::new(&config.api_url, &config.api_key, &config.from))
    } else {
        tracing::warn!("email provider not configured; emails will only be logged");
        Arc::new(LogTransport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn resend_payload_shape() {
        let transport = ResendTransport::new("https://api.resend.com/emails", "re_123", "Relay <no-reply@relay.example>");
        let payload = transport.payload(&EmailMessage {
            to: "a@example.com".into(),
            subject: "Hi".into(),
            body: "Body".into(),
        });
        assert_eq!(
            payload,
            serde_json::json!({
                "from": "Relay <no-reply@relay.example>",
                "to": ["a@example.com"],
                "subject": "Hi",
                "text": "Body",
            })
        );
    }

    #[test]
    fn unconfigured_provider_logs() {
        assert_eq!(from_config(&EmailConfig::default()).name(), "log");
        let configured = EmailConfig {
            api_key: "re_123".into(),
            from: "no-reply@relay.example".into(),
            ..Default::default()
        };
        assert_eq!(from_config(&configured).name(), "resend");
    }

    #[tokio::test]
    async fn log_transport_always_succeeds() {
        let message = EmailMessage {
            to: "a@example.com".into(),
            subject: "s".into(),
            body: "b".into(),
        };
        assert!(LogTransport.send(&message).await.is_ok());
    }
}
