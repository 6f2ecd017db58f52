//! Decision notifications
//!
//! The dispatcher is a pure builder: it produces the outbound message for
//! the card's creator and the synthetic ledger entry recording that the
//! notification happened. Delivery belongs to an external sender; a
//! delivery failure never reverses the decision it describes.
use chrono::Utc;

use super::card::{Actor, ContentCard, TimeStamp};
use super::ledger::{AuditAction, AuditEntry};

/// Attribution for ledger entries the engine writes on its own behalf.
pub const SYSTEM_ACTOR: &str = "System";

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Decision {
    Approved,
    Rejected,
    RevertedToDraft,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationMessage {
    pub to: String,
    pub to_name: String,
    pub subject: String,
    pub body: String,
    pub sent_at: TimeStamp<Utc>,
}

/// External delivery capability. Failures are reported to the caller's
/// logs only; the engine never blocks on delivery.
pub trait NotificationSender: Send + Sync {
    fn send(&self, message: &NotificationMessage) -> anyhow::Result<()>;
}

impl<T: NotificationSender + ?Sized> NotificationSender for std::sync::Arc<T> {
    fn send(&self, message: &NotificationMessage) -> anyhow::Result<()> {
        (**self).send(message)
    }
}

/// A sender for hosts without a delivery channel configured.
#[derive(Debug, Default)]
pub struct NoopSender;

impl NotificationSender for NoopSender {
    fn send(&self, _message: &NotificationMessage) -> anyhow::Result<()> {
        Ok(())
    }
}

pub struct NotificationDispatcher;

impl NotificationDispatcher {
    /// Build the creator-facing message for a decision together with the
    /// `email_notification` ledger entry recording it.
    pub fn dispatch(
        card: &ContentCard,
        decision: Decision,
        actor: &Actor,
        reason: Option<&str>,
        at: TimeStamp<Utc>,
    ) -> (AuditEntry, NotificationMessage) {
        let (subject, mut body) = match decision {
            Decision::Approved => (
                format!("\"{}\" was approved", card.title),
                format!(
                    "{} approved your {} post \"{}\".",
                    actor.name, card.platform, card.title
                ),
            ),
            Decision::Rejected => (
                format!("\"{}\" was rejected", card.title),
                format!(
                    "{} rejected your {} post \"{}\".",
                    actor.name, card.platform, card.title
                ),
            ),
            Decision::RevertedToDraft => (
                format!("\"{}\" was returned to draft", card.title),
                format!(
                    "{} returned your {} post \"{}\" to draft.",
                    actor.name, card.platform, card.title
                ),
            ),
        };
        if let Some(reason) = reason {
            body.push_str(&format!(" Reason: {reason}"));
        }

        let message = NotificationMessage {
            to: card.created_by_email.clone(),
            to_name: card.created_by.clone(),
            subject,
            body,
            sent_at: at.clone(),
        };
        let entry = AuditEntry::new(
            AuditAction::EmailNotification,
            SYSTEM_ACTOR.to_string(),
            String::new(),
            at,
            Some(format!("Notification sent to {}", card.created_by_email)),
        );

        (entry, message)
    }
}
