//! Persistence collaborator contract and the bundled sled adapter
use std::sync::Arc;

use chrono::Utc;
use sled::Batch;

use super::card::{Actor, ContentCard, Platform, TimeStamp};
use super::error::StoreError;
use super::ledger::AuditAction;
use super::utils;

/// A decision broadcast to the host's real-time notification layer.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct ApprovalEvent {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub card_id: String,
    #[n(2)]
    pub card_title: String,
    #[n(3)]
    pub platform: Platform,
    #[n(4)]
    pub action: AuditAction,
    #[n(5)]
    pub performed_by: String,
    #[n(6)]
    pub performed_by_email: String,
    #[n(7)]
    pub reason: Option<String>,
    #[n(8)]
    pub timestamp: TimeStamp<Utc>,
}

impl ApprovalEvent {
    pub fn new(
        card: &ContentCard,
        action: AuditAction,
        actor: &Actor,
        reason: Option<&str>,
        timestamp: TimeStamp<Utc>,
    ) -> Self {
        Self {
            id: utils::new_event_id(),
            card_id: card.id.clone(),
            card_title: card.title.clone(),
            platform: card.platform,
            action,
            performed_by: actor.name.clone(),
            performed_by_email: actor.email.clone(),
            reason: reason.map(str::to_string),
            timestamp,
        }
    }
}

/// The persistence collaborator the engine requires from its host.
///
/// The engine computes transitions optimistically and persists afterward;
/// a host that needs linearizable consistency must supply conditional
/// writes ("update only if status still equals X") in its implementation.
pub trait CardStore {
    fn load_card(&self, card_id: &str) -> Result<ContentCard, StoreError>;
    fn update_card(&self, card: &ContentCard) -> Result<(), StoreError>;
    fn delete_card(&self, card_id: &str) -> Result<(), StoreError>;
    fn log_approval_event(&self, event: &ApprovalEvent) -> Result<(), StoreError>;

    /// Persist a decision's card update and its broadcast event together.
    /// Stores with atomic writes should override this.
    fn record_decision(&self, card: &ContentCard, event: &ApprovalEvent) -> Result<(), StoreError> {
        self.update_card(card)?;
        self.log_approval_event(event)
    }
}

/// Resolves an approver id to a display name. Presentation only; the
/// engine never authorizes by name.
pub trait MemberDirectory {
    fn display_name(&self, member_id: &str) -> Option<String>;
}

/// Embedded store over sled, suitable for single-node hosts and tests.
pub struct SledCardStore {
    instance: Arc<sled::Db>,
}

impl SledCardStore {
    pub fn new(instance: Arc<sled::Db>) -> Self {
        Self { instance }
    }

    fn card_key(card_id: &str) -> String {
        format!("card/{card_id}")
    }

    fn event_key(event_id: &str) -> String {
        format!("event/{event_id}")
    }
}

impl CardStore for SledCardStore {
    fn load_card(&self, card_id: &str) -> Result<ContentCard, StoreError> {
        let raw = self
            .instance
            .get(Self::card_key(card_id).as_bytes())?
            .ok_or_else(|| StoreError::CardNotFound(card_id.to_string()))?;
        Ok(minicbor::decode(raw.as_ref())?)
    }

    fn update_card(&self, card: &ContentCard) -> Result<(), StoreError> {
        let encoded = minicbor::to_vec(card)?;
        self.instance
            .insert(Self::card_key(&card.id).as_bytes(), encoded)?;
        Ok(())
    }

    fn delete_card(&self, card_id: &str) -> Result<(), StoreError> {
        self.instance.remove(Self::card_key(card_id).as_bytes())?;
        Ok(())
    }

    fn log_approval_event(&self, event: &ApprovalEvent) -> Result<(), StoreError> {
        let encoded = minicbor::to_vec(event)?;
        self.instance
            .insert(Self::event_key(&event.id).as_bytes(), encoded)?;
        Ok(())
    }

    // card update and broadcast event land in one atomic batch
    fn record_decision(&self, card: &ContentCard, event: &ApprovalEvent) -> Result<(), StoreError> {
        let mut batch = Batch::default();
        batch.insert(Self::card_key(&card.id).as_bytes(), minicbor::to_vec(card)?);
        batch.insert(
            Self::event_key(&event.id).as_bytes(),
            minicbor::to_vec(event)?,
        );
        self.instance.apply_batch(batch)?;
        Ok(())
    }
}
