// src/notify/mod.rs
// =============================================================================
// This module delivers digests by email.
//
// Submodules:
// - message: Mailbox / EmailMessage, independent of any mail service
// - mailjet: the MailTransport trait, the Mailjet transport, the dry-run one
// - notifier: fire-and-forget submission of a digest
// =============================================================================

mod mailjet;
mod message;
mod notifier;

pub use mailjet::{LogTransport, MailTransport, MailjetCredentials, MailjetTransport};
pub use message::Mailbox;
pub use notifier::Notifier;

#[cfg(test)]
pub(crate) use notifier::tests::RecordingTransport;
