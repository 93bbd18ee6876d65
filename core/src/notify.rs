//! Notification port.
//!
//! The engine decides *who* should hear about a change and *what* the message
//! says; a [`Notifier`] decides *how* it is delivered (SMTP, queue, log).
//! Delivery failures are reported as values and must never abort the ticket
//! operation that triggered them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors a notifier can report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The transport refused or failed to deliver the message.
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// The message could not be rendered.
    #[error("Rendering failed: {0}")]
    Rendering(String),
}

/// A rendered-but-untemplated message addressed to one recipient.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Sender address, when the transport should not use its own default
    pub sender: Option<String>,
    /// Recipient address
    pub recipient: String,
    /// Subject line
    pub subject: String,
    /// Template name the transport renders the body from
    pub template: String,
    /// Template context
    pub context: serde_json::Value,
}

impl Notification {
    /// Creates a new notification
    #[must_use]
    pub fn new(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        template: impl Into<String>,
        context: serde_json::Value,
    ) -> Self {
        Self {
            sender: None,
            recipient: recipient.into(),
            subject: subject.into(),
            template: template.into(),
            context,
        }
    }

    /// Set the sender address
    #[must_use]
    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }
}

/// Delivers notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] when the message could not be delivered.
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Notifier that only writes the message to the log.
///
/// Used when no mail transport is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            sender = ?notification.sender,
            recipient = %notification.recipient,
            subject = %notification.subject,
            template = %notification.template,
            "Notification (log only)"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_notifier_always_succeeds() {
        let notification = Notification::new(
            "cliente@example.com",
            "Hola",
            "emails/hola",
            serde_json::json!({ "nombre": "Ana" }),
        )
        .with_sender("soporte@example.com");
        assert_eq!(notification.sender.as_deref(), Some("soporte@example.com"));
        assert!(LogNotifier.send(&notification).await.is_ok());
    }
}
