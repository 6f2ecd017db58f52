//! Approval state machine
//!
//! Validates and applies card status transitions as a pure function over
//! `(card, action, actor, at)`. A guard failure is a no-op: the card is
//! untouched, nothing is appended, and the caller learns which guard
//! failed. All entries produced by one transition share the timestamp
//! captured when the transition began and are appended in fixed order:
//! the decision entry first, "System" entries next, the notification
//! entry last.
use chrono::Utc;

use super::card::{Actor, CardPatch, CardStatus, ContentCard, TimeStamp};
use super::error::GuardViolation;
use super::ledger::{self, AuditAction, AuditEntry};
use super::notify::{Decision, NotificationDispatcher, NotificationMessage, SYSTEM_ACTOR};
use super::store::ApprovalEvent;

#[derive(Debug, Clone)]
pub enum CardAction {
    SubmitForApproval,
    Approve,
    Reject { reason: String },
    RevertToDraft { reason: String },
    MarkPublished,
    Edit { patch: CardPatch },
}

impl CardAction {
    pub fn name(&self) -> &'static str {
        match self {
            CardAction::SubmitForApproval => "submit_for_approval",
            CardAction::Approve => "approve",
            CardAction::Reject { .. } => "reject",
            CardAction::RevertToDraft { .. } => "revert_to_draft",
            CardAction::MarkPublished => "mark_published",
            CardAction::Edit { .. } => "edit",
        }
    }
}

/// The result of a valid transition: the new card value, the outbound
/// message when the action was a decision, and the broadcast event for
/// the host's real-time layer.
#[derive(Debug)]
pub struct TransitionOutcome {
    pub card: ContentCard,
    pub notification: Option<NotificationMessage>,
    pub event: Option<ApprovalEvent>,
}

impl TransitionOutcome {
    fn quiet(card: ContentCard) -> Self {
        Self {
            card,
            notification: None,
            event: None,
        }
    }
}

pub struct ApprovalStateMachine;

impl ApprovalStateMachine {
    pub fn apply(
        card: &ContentCard,
        action: CardAction,
        actor: &Actor,
        at: TimeStamp<Utc>,
    ) -> Result<TransitionOutcome, GuardViolation> {
        match action {
            CardAction::SubmitForApproval => Self::submit(card, actor, at),
            CardAction::Approve => Self::approve(card, actor, at),
            CardAction::Reject { reason } => Self::reject(card, actor, &reason, at),
            CardAction::RevertToDraft { reason } => Self::revert(card, actor, &reason, at),
            CardAction::MarkPublished => Self::publish(card, actor, at),
            CardAction::Edit { patch } => Self::edit(card, actor, patch, at),
        }
    }

    fn submit(
        card: &ContentCard,
        actor: &Actor,
        at: TimeStamp<Utc>,
    ) -> Result<TransitionOutcome, GuardViolation> {
        if !matches!(card.status, CardStatus::Draft | CardStatus::Rejected) {
            return Err(GuardViolation::InvalidState {
                action: "submit_for_approval",
                status: card.status,
            });
        }
        if card.approvers.is_empty() {
            return Err(GuardViolation::NoApproversAssigned);
        }

        let mut next = card.clone();
        next.clear_rejection();
        next.status = CardStatus::PendingApproval;

        let entry = AuditEntry::new(
            AuditAction::SubmittedForApproval,
            actor.name.clone(),
            actor.email.clone(),
            at,
            Some(format!("Sent to {} approver(s)", next.approvers.len())),
        );
        Ok(TransitionOutcome::quiet(ledger::append(&next, entry)))
    }

    fn approve(
        card: &ContentCard,
        actor: &Actor,
        at: TimeStamp<Utc>,
    ) -> Result<TransitionOutcome, GuardViolation> {
        if card.status != CardStatus::PendingApproval {
            return Err(GuardViolation::InvalidState {
                action: "approve",
                status: card.status,
            });
        }
        if !card.is_approver(&actor.id) {
            return Err(GuardViolation::NotAnApprover);
        }

        let mut next = card.clone();
        next.clear_rejection();
        next.approved_by = Some(actor.id.clone());
        next.approved_by_name = Some(actor.name.clone());
        next.approved_at = Some(at.clone());

        // a schedule set before approval routes the card straight there
        let auto_scheduled = next.scheduled_date.is_some();
        next.status = if auto_scheduled {
            CardStatus::Scheduled
        } else {
            CardStatus::Approved
        };

        let mut next = ledger::append(
            &next,
            AuditEntry::new(
                AuditAction::Approved,
                actor.name.clone(),
                actor.email.clone(),
                at.clone(),
                None,
            ),
        );
        if auto_scheduled {
            let when = match (&next.scheduled_date, &next.scheduled_time) {
                (Some(date), Some(time)) => format!("{date} at {time}"),
                (Some(date), None) => date.clone(),
                _ => String::new(),
            };
            next = ledger::append(
                &next,
                AuditEntry::new(
                    AuditAction::Scheduled,
                    SYSTEM_ACTOR.to_string(),
                    String::new(),
                    at.clone(),
                    Some(format!("Scheduled for {when}")),
                ),
            );
        }

        let (note_entry, message) =
            NotificationDispatcher::dispatch(&next, Decision::Approved, actor, None, at.clone());
        let next = ledger::append(&next, note_entry);
        let event = ApprovalEvent::new(&next, AuditAction::Approved, actor, None, at);

        Ok(TransitionOutcome {
            card: next,
            notification: Some(message),
            event: Some(event),
        })
    }

    fn reject(
        card: &ContentCard,
        actor: &Actor,
        reason: &str,
        at: TimeStamp<Utc>,
    ) -> Result<TransitionOutcome, GuardViolation> {
        if card.status != CardStatus::PendingApproval {
            return Err(GuardViolation::InvalidState {
                action: "reject",
                status: card.status,
            });
        }
        if !card.is_approver(&actor.id) {
            return Err(GuardViolation::NotAnApprover);
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(GuardViolation::MissingReason);
        }

        let mut next = card.clone();
        next.clear_approval();
        next.rejected_by = Some(actor.id.clone());
        next.rejected_by_name = Some(actor.name.clone());
        next.rejected_at = Some(at.clone());
        next.rejection_reason = Some(reason.to_string());
        next.status = CardStatus::Rejected;

        let next = ledger::append(
            &next,
            AuditEntry::new(
                AuditAction::Rejected,
                actor.name.clone(),
                actor.email.clone(),
                at.clone(),
                Some(reason.to_string()),
            ),
        );
        let (note_entry, message) = NotificationDispatcher::dispatch(
            &next,
            Decision::Rejected,
            actor,
            Some(reason),
            at.clone(),
        );
        let next = ledger::append(&next, note_entry);
        let event = ApprovalEvent::new(&next, AuditAction::Rejected, actor, Some(reason), at);

        Ok(TransitionOutcome {
            card: next,
            notification: Some(message),
            event: Some(event),
        })
    }

    fn revert(
        card: &ContentCard,
        actor: &Actor,
        reason: &str,
        at: TimeStamp<Utc>,
    ) -> Result<TransitionOutcome, GuardViolation> {
        if !matches!(
            card.status,
            CardStatus::Rejected | CardStatus::PendingApproval
        ) {
            return Err(GuardViolation::InvalidState {
                action: "revert_to_draft",
                status: card.status,
            });
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(GuardViolation::MissingReason);
        }

        let mut next = card.clone();
        next.clear_approval();
        next.clear_rejection();
        next.status = CardStatus::Draft;

        let next = ledger::append(
            &next,
            AuditEntry::new(
                AuditAction::StatusChanged,
                actor.name.clone(),
                actor.email.clone(),
                at.clone(),
                Some(format!("Reverted to draft: {reason}")),
            ),
        );
        let (note_entry, message) = NotificationDispatcher::dispatch(
            &next,
            Decision::RevertedToDraft,
            actor,
            Some(reason),
            at.clone(),
        );
        let next = ledger::append(&next, note_entry);
        let event = ApprovalEvent::new(&next, AuditAction::StatusChanged, actor, Some(reason), at);

        Ok(TransitionOutcome {
            card: next,
            notification: Some(message),
            event: Some(event),
        })
    }

    fn publish(
        card: &ContentCard,
        actor: &Actor,
        at: TimeStamp<Utc>,
    ) -> Result<TransitionOutcome, GuardViolation> {
        if card.status != CardStatus::Scheduled {
            return Err(GuardViolation::InvalidState {
                action: "mark_published",
                status: card.status,
            });
        }

        let mut next = card.clone();
        next.status = CardStatus::Published;

        let entry = AuditEntry::new(
            AuditAction::Published,
            actor.name.clone(),
            actor.email.clone(),
            at,
            None,
        );
        Ok(TransitionOutcome::quiet(ledger::append(&next, entry)))
    }

    fn edit(
        card: &ContentCard,
        actor: &Actor,
        patch: CardPatch,
        at: TimeStamp<Utc>,
    ) -> Result<TransitionOutcome, GuardViolation> {
        if !matches!(card.status, CardStatus::Draft | CardStatus::Rejected) {
            return Err(GuardViolation::InvalidState {
                action: "edit",
                status: card.status,
            });
        }

        let mut next = card.clone();
        let changed = patch.apply_to(&mut next);
        next.last_edited_by = Some(actor.name.clone());
        next.last_edited_at = Some(at.clone());

        let details = if changed.is_empty() {
            "No fields changed".to_string()
        } else {
            format!("Updated {}", changed.join(", "))
        };
        let entry = AuditEntry::new(
            AuditAction::Edited,
            actor.name.clone(),
            actor.email.clone(),
            at,
            Some(details),
        );
        Ok(TransitionOutcome::quiet(ledger::append(&next, entry)))
    }
}
