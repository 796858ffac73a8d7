//! Request domain errors

use thiserror::Error;

use core_kernel::{Money, MoneyError, UserId};
use crate::request::RequestStatus;

/// Errors that can occur in the request domain
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    /// The request is COMPLETED and can no longer change
    #[error("Request is {status} and can no longer be changed")]
    TerminalState { status: RequestStatus },

    /// The transition does not follow the approval sequence
    #[error("Cannot move request from {from} to {to}")]
    InvalidTransition {
        from: RequestStatus,
        to: RequestStatus,
    },

    /// The actor is not entitled to the transition
    #[error("User {actor} is not allowed to {action}")]
    Forbidden { actor: UserId, action: String },

    /// Funding would take more than the request still needs
    #[error("Cannot deduct {deducted} from a remaining balance of {remaining}")]
    FundingExceedsRemainder { deducted: Money, remaining: Money },

    /// Funding would take more than the ledger held at creation
    #[error("Cannot deduct {deducted}: ledger held {snapshot} at creation and {drawn} was already drawn")]
    FundingExceedsSnapshot {
        deducted: Money,
        snapshot: Money,
        drawn: Money,
    },

    /// Input failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Money error: {0}")]
    Money(#[from] MoneyError),
}

impl RequestError {
    pub fn validation(message: impl Into<String>) -> Self {
        RequestError::Validation(message.into())
    }

    pub fn forbidden(actor: UserId, action: impl Into<String>) -> Self {
        RequestError::Forbidden {
            actor,
            action: action.into(),
        }
    }
}
