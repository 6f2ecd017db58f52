use super::card::CardStatus;

/// An action was attempted outside its valid state/actor combination.
/// The transition is a no-op; the card is left untouched.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardViolation {
    #[error("'{action}' is not allowed while the card is {status}")]
    InvalidState {
        action: &'static str,
        status: CardStatus,
    },
    #[error("Actor is not one of the card's designated approvers")]
    NotAnApprover,
    #[error("A non-empty reason is required")]
    MissingReason,
    #[error("Card cannot be submitted without any approvers assigned")]
    NoApproversAssigned,
}

/// A card draft is missing a required field.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DraftError {
    #[error("Card title is not set")]
    MissingTitle,
    #[error("Card does not belong to a project")]
    MissingProject,
    #[error("Card does not target a platform")]
    MissingPlatform,
}

/// Failure reported by the persistence collaborator.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("Card {0} was not found")]
    CardNotFound(String),
    #[error("Stored value could not be decoded: {0}")]
    Decode(String),
    #[error("Value could not be encoded for storage: {0}")]
    Encode(String),
    #[error("Storage backend failure: {0}")]
    Backend(String),
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<minicbor::decode::Error> for StoreError {
    fn from(err: minicbor::decode::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}

impl<E: std::fmt::Display> From<minicbor::encode::Error<E>> for StoreError {
    fn from(err: minicbor::encode::Error<E>) -> Self {
        StoreError::Encode(err.to_string())
    }
}

/// SLA threshold save rejected locally before any write is attempted.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("Warning threshold must be at least 1 hour")]
    WarningBelowMinimum,
    #[error("Breach threshold must be greater than the warning threshold")]
    BreachNotAfterWarning,
    #[error("Breach threshold must be at most 720 hours")]
    BreachAboveMaximum,
}
