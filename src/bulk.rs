//! Bulk approval across a caller-selected subset of cards
//!
//! The coordinator owns no transition logic of its own: every card goes
//! through the same state machine as the single-card flows, with guards
//! re-checked at execution time. A selection that went stale between
//! selection and execution is skipped, never an error, and the batch is
//! never atomic.
use super::card::{Actor, CardStatus, ContentCard};
use super::error::GuardViolation;
use super::notify::NotificationSender;
use super::service::CardService;
use super::store::CardStore;

#[derive(Debug, Clone)]
pub enum BulkDecision {
    Approve,
    Reject { reason: String },
}

#[derive(Debug)]
pub enum BulkOutcome {
    Applied {
        card_id: String,
    },
    /// The guard no longer held at execution time.
    Skipped {
        card_id: String,
        guard: GuardViolation,
    },
    Failed {
        card_id: String,
        error: anyhow::Error,
    },
}

impl BulkOutcome {
    pub fn card_id(&self) -> &str {
        match self {
            BulkOutcome::Applied { card_id }
            | BulkOutcome::Skipped { card_id, .. }
            | BulkOutcome::Failed { card_id, .. } => card_id,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, BulkOutcome::Applied { .. })
    }
}

pub struct BulkApprovalCoordinator;

impl BulkApprovalCoordinator {
    /// The subset the actor may act on: pending approval and the actor is
    /// one of the card's approvers.
    pub fn selectable<'a>(cards: &'a [ContentCard], actor: &Actor) -> Vec<&'a ContentCard> {
        cards
            .iter()
            .filter(|c| c.status == CardStatus::PendingApproval && c.is_approver(&actor.id))
            .collect()
    }

    /// Apply the decision to each selected card, reporting per-card
    /// outcomes.
    pub fn execute<S: CardStore, N: NotificationSender>(
        service: &CardService<S, N>,
        selected_ids: &[String],
        actor: &Actor,
        decision: &BulkDecision,
    ) -> Vec<BulkOutcome> {
        selected_ids
            .iter()
            .map(|card_id| {
                let result = match decision {
                    BulkDecision::Approve => service.approve_card(card_id, actor),
                    BulkDecision::Reject { reason } => service.reject_card(card_id, actor, reason),
                };
                match result {
                    Ok(_) => BulkOutcome::Applied {
                        card_id: card_id.clone(),
                    },
                    Err(err) => match err.downcast::<GuardViolation>() {
                        Ok(guard) => BulkOutcome::Skipped {
                            card_id: card_id.clone(),
                            guard,
                        },
                        Err(error) => BulkOutcome::Failed {
                            card_id: card_id.clone(),
                            error,
                        },
                    },
                }
            })
            .collect()
    }
}
