//! # Notification Dispatcher
//!
//! The sweep hands notifications to a [`NotificationDispatcher`]: one email
//! and one in-app alert per event. Delivery is outside the engine;
//! the bundled implementations either log ([`TracingDispatcher`]) or
//! collect ([`OutboxDispatcher`]) what would be sent.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use doctrack_core::ApplicationId;

use crate::error::NotifyError;

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// The document expires soon.
    ExpiryReminder,
    /// The document has expired.
    Expired,
}

impl NotificationKind {
    /// Email subject and alert title.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::ExpiryReminder => "Document Expiry Reminder",
            Self::Expired => "Document Expired",
        }
    }

    /// Metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExpiryReminder => "expiry_reminder",
            Self::Expired => "expired",
        }
    }
}

/// An outgoing email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    /// Addresses to deliver to.
    pub recipients: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// Body text.
    pub message: String,
    /// Document the email is about.
    pub document: ApplicationId,
    /// Event kind.
    pub kind: NotificationKind,
}

/// An in-app alert shown to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertLog {
    /// User to alert.
    pub user: String,
    /// Alert title.
    pub subject: String,
    /// Alert body.
    pub message: String,
    /// Document the alert links to.
    pub document: ApplicationId,
    /// Event kind.
    pub kind: NotificationKind,
}

/// Delivery of emails and in-app alerts.
pub trait NotificationDispatcher: Send + Sync {
    /// Send an email.
    fn send_email(&self, email: &EmailMessage) -> Result<(), NotifyError>;

    /// Create an in-app alert.
    fn create_alert(&self, alert: &AlertLog) -> Result<(), NotifyError>;
}

/// Writes every notification as a structured log event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDispatcher;

impl NotificationDispatcher for TracingDispatcher {
    fn send_email(&self, email: &EmailMessage) -> Result<(), NotifyError> {
        tracing::info!(
            document_id = %email.document,
            kind = email.kind.as_str(),
            recipients = ?email.recipients,
            subject = %email.subject,
            "email: {}",
            email.message
        );
        Ok(())
    }

    fn create_alert(&self, alert: &AlertLog) -> Result<(), NotifyError> {
        tracing::info!(
            document_id = %alert.document,
            kind = alert.kind.as_str(),
            user = %alert.user,
            "alert: {}",
            alert.message
        );
        Ok(())
    }
}

/// Everything an [`OutboxDispatcher`] has collected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outbox {
    /// Emails, in dispatch order.
    pub emails: Vec<EmailMessage>,
    /// Alerts, in dispatch order.
    pub alerts: Vec<AlertLog>,
}

/// Collects notifications in memory.
#[derive(Debug, Default)]
pub struct OutboxDispatcher {
    outbox: Mutex<Outbox>,
}

impl OutboxDispatcher {
    /// Create an empty outbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything collected so far.
    pub fn snapshot(&self) -> Outbox {
        self.outbox.lock().clone()
    }

    /// Take everything collected so far, leaving the outbox empty.
    pub fn drain(&self) -> Outbox {
        std::mem::take(&mut *self.outbox.lock())
    }
}

impl NotificationDispatcher for OutboxDispatcher {
    fn send_email(&self, email: &EmailMessage) -> Result<(), NotifyError> {
        self.outbox.lock().emails.push(email.clone());
        Ok(())
    }

    fn create_alert(&self, alert: &AlertLog) -> Result<(), NotifyError> {
        self.outbox.lock().alerts.push(alert.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> EmailMessage {
        EmailMessage {
            recipients: vec!["asha@example.com".into()],
            subject: NotificationKind::Expired.subject().into(),
            message: "Document X expired on 2024-01-01".into(),
            document: ApplicationId::new(),
            kind: NotificationKind::Expired,
        }
    }

    #[test]
    fn test_outbox_collects_and_drains() {
        let outbox = OutboxDispatcher::new();
        let e = email();
        outbox.send_email(&e).unwrap();
        outbox
            .create_alert(&AlertLog {
                user: "officer".into(),
                subject: e.subject.clone(),
                message: e.message.clone(),
                document: e.document,
                kind: e.kind,
            })
            .unwrap();

        assert_eq!(outbox.snapshot().emails, vec![e]);
        let drained = outbox.drain();
        assert_eq!(drained.alerts.len(), 1);
        assert_eq!(outbox.snapshot(), Outbox::default());
    }

    #[test]
    fn test_tracing_dispatcher_never_fails() {
        assert!(TracingDispatcher.send_email(&email()).is_ok());
    }

    #[test]
    fn test_subjects() {
        assert_eq!(NotificationKind::ExpiryReminder.subject(), "Document Expiry Reminder");
        assert_eq!(NotificationKind::Expired.subject(), "Document Expired");
    }

    #[test]
    fn test_outbox_json_shape() {
        let json = serde_json::to_value(Outbox {
            emails: vec![email()],
            alerts: vec![],
        })
        .unwrap();
        assert_eq!(json["emails"][0]["kind"], "expired");
    }
}
