//! Service layer API for card workflow operations
//!
//! One method per workflow operation: load, apply the state machine,
//! persist, then hand the message to the delivery collaborator. The
//! updated card is returned only after persistence succeeds, so callers
//! that keep their pre-transition copy never observe a half-applied
//! transition.
use std::sync::Arc;

use anyhow::Context;

use super::card::{Actor, CardDraft, CardPatch, ContentCard};
use super::clock::{self, Clock, SlaSnapshot, SystemClock};
use super::config::SlaThresholds;
use super::ledger::{self, AuditAction, AuditEntry};
use super::machine::{ApprovalStateMachine, CardAction, TransitionOutcome};
use super::notify::NotificationSender;
use super::store::{CardStore, MemberDirectory};

pub struct CardService<S, N> {
    store: S,
    sender: N,
    clock: Arc<dyn Clock>,
}

impl<S: CardStore, N: NotificationSender> CardService<S, N> {
    pub fn new(store: S, sender: N, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            sender,
            clock,
        }
    }

    pub fn with_system_clock(store: S, sender: N) -> Self {
        Self::new(store, sender, Arc::new(SystemClock))
    }

    /// Validate a draft, mint the card, and persist it.
    pub fn create_card(&self, draft: CardDraft, actor: &Actor) -> anyhow::Result<ContentCard> {
        let card = draft.build(actor, self.clock.now())?;
        self.store
            .update_card(&card)
            .context("failed to persist new card")?;
        tracing::debug!(card = %card.id, "card created");
        Ok(card)
    }

    pub fn load_card(&self, card_id: &str) -> anyhow::Result<ContentCard> {
        Ok(self.store.load_card(card_id)?)
    }

    pub fn submit_card(&self, card_id: &str, actor: &Actor) -> anyhow::Result<ContentCard> {
        self.transition(card_id, CardAction::SubmitForApproval, actor)
    }

    pub fn approve_card(&self, card_id: &str, actor: &Actor) -> anyhow::Result<ContentCard> {
        self.transition(card_id, CardAction::Approve, actor)
    }

    pub fn reject_card(
        &self,
        card_id: &str,
        actor: &Actor,
        reason: &str,
    ) -> anyhow::Result<ContentCard> {
        self.transition(
            card_id,
            CardAction::Reject {
                reason: reason.to_string(),
            },
            actor,
        )
    }

    pub fn revert_card(
        &self,
        card_id: &str,
        actor: &Actor,
        reason: &str,
    ) -> anyhow::Result<ContentCard> {
        self.transition(
            card_id,
            CardAction::RevertToDraft {
                reason: reason.to_string(),
            },
            actor,
        )
    }

    pub fn publish_card(&self, card_id: &str, actor: &Actor) -> anyhow::Result<ContentCard> {
        self.transition(card_id, CardAction::MarkPublished, actor)
    }

    pub fn edit_card(
        &self,
        card_id: &str,
        patch: CardPatch,
        actor: &Actor,
    ) -> anyhow::Result<ContentCard> {
        self.transition(card_id, CardAction::Edit { patch }, actor)
    }

    /// Callback surface for the external media generation job. No status
    /// change; the upload is recorded in the ledger.
    pub fn attach_media(
        &self,
        card_id: &str,
        url: &str,
        actor: &Actor,
    ) -> anyhow::Result<ContentCard> {
        let card = self.store.load_card(card_id)?;
        let mut next = card;
        next.media_urls.push(url.to_string());
        let next = ledger::append(
            &next,
            AuditEntry::new(
                AuditAction::MediaUploaded,
                actor.name.clone(),
                actor.email.clone(),
                self.clock.now(),
                Some(url.to_string()),
            ),
        );
        self.store
            .update_card(&next)
            .context("failed to persist media attachment")?;
        Ok(next)
    }

    pub fn remove_media(
        &self,
        card_id: &str,
        url: &str,
        actor: &Actor,
    ) -> anyhow::Result<ContentCard> {
        let card = self.store.load_card(card_id)?;
        if !card.media_urls.iter().any(|u| u == url) {
            return Ok(card);
        }
        let mut next = card;
        next.media_urls.retain(|u| u != url);
        let next = ledger::append(
            &next,
            AuditEntry::new(
                AuditAction::MediaRemoved,
                actor.name.clone(),
                actor.email.clone(),
                self.clock.now(),
                Some(url.to_string()),
            ),
        );
        self.store
            .update_card(&next)
            .context("failed to persist media removal")?;
        Ok(next)
    }

    /// Deletion is an explicit operation, never a side effect of a
    /// transition.
    pub fn delete_card(&self, card_id: &str) -> anyhow::Result<()> {
        self.store
            .delete_card(card_id)
            .context("failed to delete card")?;
        Ok(())
    }

    /// Elapsed/remaining/status in one read, using the service clock.
    pub fn sla(&self, card: &ContentCard, thresholds: &SlaThresholds) -> SlaSnapshot {
        clock::sla_snapshot(card, thresholds, &self.clock.now())
    }

    fn transition(
        &self,
        card_id: &str,
        action: CardAction,
        actor: &Actor,
    ) -> anyhow::Result<ContentCard> {
        let card = self.store.load_card(card_id)?;
        let action_name = action.name();
        let outcome = ApprovalStateMachine::apply(&card, action, actor, self.clock.now())?;
        let TransitionOutcome {
            card: next,
            notification,
            event,
        } = outcome;

        match &event {
            Some(event) => self
                .store
                .record_decision(&next, event)
                .context("failed to persist decision")?,
            None => self
                .store
                .update_card(&next)
                .context("failed to persist card update")?,
        }
        tracing::debug!(
            card = %next.id,
            action = action_name,
            status = %next.status,
            "transition applied"
        );

        if let Some(message) = notification {
            if let Err(err) = self.sender.send(&message) {
                tracing::warn!(
                    card = %next.id,
                    to = %message.to,
                    error = %err,
                    "notification delivery failed; decision stands"
                );
            }
        }

        Ok(next)
    }
}

/// Resolve the card's approver ids to display names, falling back to the
/// raw id when the directory has no entry.
pub fn approver_display_names(card: &ContentCard, directory: &dyn MemberDirectory) -> Vec<String> {
    card.approvers
        .iter()
        .map(|id| directory.display_name(id).unwrap_or_else(|| id.clone()))
        .collect()
}
