//! Append-only audit ledger
//!
//! Every card owns an ordered list of immutable [`AuditEntry`] facts, the
//! single source of historical truth. Entries are only ever appended, and
//! appends return a new card value rather than mutating in place, so a
//! caller can hold its pre-transition copy until persistence confirms.
use chrono::Utc;

use super::card::{ContentCard, TimeStamp};
use super::utils;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, Eq, PartialEq)]
pub enum AuditAction {
    #[n(0)]
    Created,
    #[n(1)]
    Edited,
    #[n(2)]
    MediaUploaded,
    #[n(3)]
    MediaRemoved,
    #[n(4)]
    SubmittedForApproval,
    #[n(5)]
    Approved,
    #[n(6)]
    Rejected,
    #[n(7)]
    Scheduled,
    #[n(8)]
    Published,
    #[n(9)]
    StatusChanged,
    #[n(10)]
    EmailNotification,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AuditAction::Created => "created",
            AuditAction::Edited => "edited",
            AuditAction::MediaUploaded => "media_uploaded",
            AuditAction::MediaRemoved => "media_removed",
            AuditAction::SubmittedForApproval => "submitted_for_approval",
            AuditAction::Approved => "approved",
            AuditAction::Rejected => "rejected",
            AuditAction::Scheduled => "scheduled",
            AuditAction::Published => "published",
            AuditAction::StatusChanged => "status_changed",
            AuditAction::EmailNotification => "email_notification",
        };
        write!(f, "{name}")
    }
}

/// One immutable fact about a card's history. Fields are fixed at
/// construction and read through accessors only.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct AuditEntry {
    #[n(0)]
    id: String,
    #[n(1)]
    action: AuditAction,
    #[n(2)]
    performed_by: String,
    #[n(3)]
    performed_by_email: String,
    #[n(4)]
    timestamp: TimeStamp<Utc>,
    #[n(5)]
    details: Option<String>,
}

impl AuditEntry {
    pub fn new(
        action: AuditAction,
        performed_by: String,
        performed_by_email: String,
        timestamp: TimeStamp<Utc>,
        details: Option<String>,
    ) -> Self {
        Self {
            id: utils::new_entry_id(),
            action,
            performed_by,
            performed_by_email,
            timestamp,
            details,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
    pub fn action(&self) -> AuditAction {
        self.action
    }
    pub fn performed_by(&self) -> &str {
        &self.performed_by
    }
    pub fn performed_by_email(&self) -> &str {
        &self.performed_by_email
    }
    pub fn timestamp(&self) -> &TimeStamp<Utc> {
        &self.timestamp
    }
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    // per-card order must stay monotonic even if the wall clock stepped back
    pub(crate) fn clamp_timestamp(&mut self, floor: &TimeStamp<Utc>) {
        if self.timestamp < *floor {
            self.timestamp = floor.clone();
        }
    }
}

/// Append one entry, returning a new card value with the ledger extended.
/// The entry's timestamp is clamped so it never precedes the last entry.
pub fn append(card: &ContentCard, mut entry: AuditEntry) -> ContentCard {
    let mut next = card.clone();
    let floor = next.audit_log().last().map(|e| e.timestamp().clone());
    if let Some(floor) = floor {
        entry.clamp_timestamp(&floor);
    }
    next.push_entry(entry);
    next
}

/// Read-only view over a card's ledger, oldest first.
pub fn entries_of(card: &ContentCard) -> &[AuditEntry] {
    card.audit_log()
}

/// Entries of one action kind, for UI grouping.
pub fn entries_for_action(card: &ContentCard, action: AuditAction) -> Vec<&AuditEntry> {
    card.audit_log()
        .iter()
        .filter(|e| e.action() == action)
        .collect()
}

/// The most recent entry of one action kind, if any.
pub fn last_entry_for_action(card: &ContentCard, action: AuditAction) -> Option<&AuditEntry> {
    card.audit_log()
        .iter()
        .rev()
        .find(|e| e.action() == action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{Actor, CardDraft, Platform};

    fn test_card() -> ContentCard {
        let actor = Actor::new(
            "member_1".into(),
            "Dana Cole".into(),
            "dana@example.com".into(),
        );
        CardDraft::new()
            .set_project("proj_1")
            .set_platform(Platform::Facebook)
            .set_title("Ledger test card")
            .build(&actor, TimeStamp::new_with(2025, 1, 1, 0, 0, 0))
            .unwrap()
    }

    #[test]
    fn append_extends_without_mutating_original() {
        let card = test_card();
        let entry = AuditEntry::new(
            AuditAction::Edited,
            "Dana Cole".into(),
            "dana@example.com".into(),
            TimeStamp::new_with(2025, 1, 2, 0, 0, 0),
            Some("Updated caption".into()),
        );

        let next = append(&card, entry);

        assert_eq!(card.audit_log().len(), 1);
        assert_eq!(next.audit_log().len(), 2);
    }

    #[test]
    fn append_clamps_regressing_timestamps() {
        let card = test_card();
        // earlier than the creation entry
        let entry = AuditEntry::new(
            AuditAction::Edited,
            "Dana Cole".into(),
            "dana@example.com".into(),
            TimeStamp::new_with(2024, 12, 31, 0, 0, 0),
            None,
        );

        let next = append(&card, entry);
        let log = next.audit_log();

        assert!(log[1].timestamp() >= log[0].timestamp());
    }

    #[test]
    fn entries_filter_by_action() {
        let card = test_card();
        let next = append(
            &card,
            AuditEntry::new(
                AuditAction::Edited,
                "Dana Cole".into(),
                "dana@example.com".into(),
                TimeStamp::new_with(2025, 1, 2, 0, 0, 0),
                None,
            ),
        );

        assert_eq!(entries_of(&next).len(), 2);
        assert_eq!(entries_for_action(&next, AuditAction::Edited).len(), 1);
        assert_eq!(entries_for_action(&next, AuditAction::Approved).len(), 0);
        assert!(last_entry_for_action(&next, AuditAction::Created).is_some());
    }
}
