// src/notify/mailjet.rs
// =============================================================================
// Email transports.
//
// - MailjetTransport: Mailjet Send API v3.1 over HTTPS with basic auth
// - LogTransport: writes the message to the log instead (--dry-run)
//
// A transport only reports what happened. Retrying, or failing the run, is
// not its call - and the notifier does neither.
// =============================================================================

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use super::message::{EmailMessage, Mailbox};

pub const MAILJET_SEND_URL: &str = "https://api.mailjet.com/v3.1/send";

#[derive(Debug, Error)]
pub enum TransportError {
    /// The request never got an HTTP response (DNS, TLS, timeout...)
    #[error("request to mail service failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// What the mail service answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub status: u16,
    pub body: String,
}

impl DeliveryReport {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, message: &EmailMessage) -> Result<DeliveryReport, TransportError>;
}

#[derive(Debug, Clone)]
pub struct MailjetCredentials {
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Debug, Clone)]
pub struct MailjetTransport {
    client: Client,
    credentials: MailjetCredentials,
    endpoint: String,
    // Mailjet validates the request but does not deliver it
    sandbox: bool,
}

impl MailjetTransport {
    pub fn new(credentials: MailjetCredentials, sandbox: bool) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            credentials,
            endpoint: MAILJET_SEND_URL.to_string(),
            sandbox,
        })
    }
}

#[async_trait]
impl MailTransport for MailjetTransport {
    fn name(&self) -> &'static str {
        "mailjet"
    }

    async fn send(&self, message: &EmailMessage) -> Result<DeliveryReport, TransportError> {
        let request = SendRequest::new(message, self.sandbox);

        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.credentials.api_key, Some(&self.credentials.api_secret))
            .json(&request)
            .send()
            .await?;

        let status = response.status().as_u16();
        // The body explains rejections (bad credentials, malformed message)
        let body = response.text().await.unwrap_or_default();

        Ok(DeliveryReport { status, body })
    }
}

// Request body of POST /v3.1/send
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SendRequest<'a> {
    messages: Vec<MessagePayload<'a>>,
    sandbox_mode: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct MessagePayload<'a> {
    from: Address<'a>,
    to: Vec<Address<'a>>,
    subject: &'a str,
    text_part: &'a str,
    #[serde(rename = "HTMLPart")]
    html_part: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

impl<'a> From<&'a Mailbox> for Address<'a> {
    fn from(mailbox: &'a Mailbox) -> Self {
        Self {
            email: &mailbox.email,
            name: mailbox.name.as_deref(),
        }
    }
}

impl<'a> SendRequest<'a> {
    fn new(message: &'a EmailMessage, sandbox_mode: bool) -> Self {
        Self {
            messages: vec![MessagePayload {
                from: Address::from(&message.from),
                to: message.to.iter().map(Address::from).collect(),
                subject: &message.subject,
                text_part: &message.text_part,
                html_part: &message.html_part,
            }],
            sandbox_mode,
        }
    }
}

// Transport for dry runs: nothing leaves the machine.
#[derive(Debug, Clone, Default)]
pub struct LogTransport;

#[async_trait]
impl MailTransport for LogTransport {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, message: &EmailMessage) -> Result<DeliveryReport, TransportError> {
        let recipients = message
            .to
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");

        tracing::info!(
            from = %message.from,
            to = %recipients,
            subject = %message.subject,
            html_bytes = message.html_part.len(),
            "dry run, email not sent"
        );
        tracing::debug!("{}", message.html_part);

        Ok(DeliveryReport {
            status: 200,
            body: "dry run".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message() -> EmailMessage {
        EmailMessage {
            from: Mailbox::new("bot@example.com", Some("Job Bot".to_string())),
            to: vec![
                Mailbox::new("jane@example.com", Some("Jane".to_string())),
                Mailbox::new("ops@example.com", None),
            ],
            subject: "Jobs - 2026-10-18 09:00 (UTC+08:00)".to_string(),
            text_part: "Latest postings.".to_string(),
            html_part: "<div class=\"listing\"></div>".to_string(),
        }
    }

    #[test]
    fn test_request_body_matches_mailjet_schema() {
        let message = message();
        let body = serde_json::to_value(SendRequest::new(&message, true)).unwrap();

        assert_eq!(
            body,
            json!({
                "Messages": [{
                    "From": { "Email": "bot@example.com", "Name": "Job Bot" },
                    "To": [
                        { "Email": "jane@example.com", "Name": "Jane" },
                        { "Email": "ops@example.com" }
                    ],
                    "Subject": "Jobs - 2026-10-18 09:00 (UTC+08:00)",
                    "TextPart": "Latest postings.",
                    "HTMLPart": "<div class=\"listing\"></div>"
                }],
                "SandboxMode": true
            })
        );
    }

    #[test]
    fn test_delivery_report_success_range() {
        let ok = DeliveryReport { status: 200, body: String::new() };
        let unauthorized = DeliveryReport { status: 401, body: String::new() };
        assert!(ok.is_success());
        assert!(!unauthorized.is_success());
    }

    #[tokio::test]
    async fn test_log_transport_never_fails() {
        let report = LogTransport.send(&message()).await.unwrap();
        assert!(report.is_success());
    }
}
