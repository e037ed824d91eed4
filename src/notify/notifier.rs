// src/notify/notifier.rs
// =============================================================================
// Notifier: hands a digest to the mail transport and walks away.
//
// notify() spawns the send on its own task and returns immediately. The run
// is finished once the digest is handed off; the delivery outcome shows up in
// the log later. Nothing is retried.
// =============================================================================

use std::sync::Arc;
use tokio::task::JoinHandle;

use super::mailjet::MailTransport;
use super::message::{EmailMessage, Mailbox};
use crate::digest::Digest;

pub struct Notifier {
    transport: Arc<dyn MailTransport>,
    sender: Mailbox,
    recipients: Vec<Mailbox>,
    text_part: String,
}

impl Notifier {
    pub fn new(
        transport: Arc<dyn MailTransport>,
        sender: Mailbox,
        recipients: Vec<Mailbox>,
        text_part: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            sender,
            recipients,
            text_part: text_part.into(),
        }
    }

    pub fn build_message(&self, digest: &Digest) -> EmailMessage {
        EmailMessage {
            from: self.sender.clone(),
            to: self.recipients.clone(),
            subject: digest.subject.clone(),
            text_part: self.text_part.clone(),
            html_part: digest.html_body.clone(),
        }
    }

    // Submits one email for `digest` in the background.
    //
    // The returned handle is only useful to callers that want to wait for the
    // outcome to be logged (one-shot mode, tests); the daemon drops it.
    pub fn notify(&self, digest: &Digest) -> JoinHandle<()> {
        let message = self.build_message(digest);
        let transport = self.transport.clone();

        tokio::spawn(async move {
            match transport.send(&message).await {
                Ok(report) if report.is_success() => {
                    tracing::info!(
                        transport = transport.name(),
                        status = report.status,
                        recipients = message.to.len(),
                        "digest delivered: {}",
                        report.body
                    );
                }
                Ok(report) => {
                    tracing::error!(
                        transport = transport.name(),
                        status = report.status,
                        "mail service rejected digest: {}",
                        report.body
                    );
                }
                Err(e) => {
                    tracing::error!(transport = transport.name(), "failed to send digest: {}", e);
                }
            }
        })
    }
}
