//! Lifecycle errors
//!
//! Every failure a lifecycle operation can surface, classified for the retry
//! combinator. Only [`LifecycleError::TransientStorage`] is retried.

use thiserror::Error;

use core_kernel::{PortError, RetryClass};
use domain_accounting::AccountingError;
use domain_balance::BalanceError;
use domain_request::RequestError;

/// Errors returned by the lifecycle services
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Mutation of a COMPLETED request or a CLOSED block
    #[error("Terminal state violation: {0}")]
    TerminalStateViolation(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Concurrent change detected; the caller should reload and decide again
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Stored data broke a ledger invariant
    #[error("Integrity violation: {0}")]
    IntegrityViolation(String),

    /// Closing statement generation or upload failed
    #[error("Document error: {0}")]
    Document(String),

    /// Connection-level failure; safe to retry
    #[error("Transient storage error: {0}")]
    TransientStorage(#[source] PortError),

    #[error("Storage error: {0}")]
    Storage(#[source] PortError),
}

impl LifecycleError {
    pub fn not_found(entity: impl Into<String>, id: impl std::fmt::Display) -> Self {
        LifecycleError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        LifecycleError::Forbidden(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        LifecycleError::Conflict(message.into())
    }

    /// Wraps a generator or storage failure
    pub fn document(error: PortError) -> Self {
        LifecycleError::Document(error.to_string())
    }

    /// Classifier passed to [`core_kernel::with_retry`]
    pub fn retry_class(&self) -> RetryClass {
        match self {
            LifecycleError::TransientStorage(_) => RetryClass::Transient,
            _ => RetryClass::Terminal,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.retry_class() == RetryClass::Transient
    }
}

impl From<PortError> for LifecycleError {
    fn from(error: PortError) -> Self {
        if error.is_transient() {
            return LifecycleError::TransientStorage(error);
        }
        match error {
            PortError::NotFound { entity_type, id } => LifecycleError::NotFound { entity: entity_type, id },
            PortError::Validation { message } => LifecycleError::Validation(message),
            PortError::Conflict { message } => LifecycleError::Conflict(message),
            other => LifecycleError::Storage(other),
        }
    }
}

impl From<RequestError> for LifecycleError {
    fn from(error: RequestError) -> Self {
        let message = error.to_string();
        match error {
            RequestError::TerminalState { .. } => LifecycleError::TerminalStateViolation(message),
            RequestError::InvalidTransition { .. } => LifecycleError::InvalidTransition(message),
            RequestError::Forbidden { .. } => LifecycleError::Forbidden(message),
            RequestError::FundingExceedsRemainder { .. } | RequestError::FundingExceedsSnapshot { .. } => {
                LifecycleError::IntegrityViolation(message)
            }
            RequestError::Validation(_) | RequestError::Money(_) => LifecycleError::Validation(message),
        }
    }
}

impl From<AccountingError> for LifecycleError {
    fn from(error: AccountingError) -> Self {
        let message = error.to_string();
        match error {
            AccountingError::BlockClosed { .. } => LifecycleError::TerminalStateViolation(message),
            AccountingError::InvalidStatus { .. } => LifecycleError::InvalidTransition(message),
            AccountingError::NotCreator { .. } => LifecycleError::Forbidden(message),
            AccountingError::ReimbursementAlreadyInitiated { .. } => LifecycleError::Conflict(message),
            AccountingError::InvalidBlockCode(_) | AccountingError::BalanceDrift { .. } => {
                LifecycleError::IntegrityViolation(message)
            }
            AccountingError::InvalidExpense(_)
            | AccountingError::NothingToReimburse { .. }
            | AccountingError::Money(_) => LifecycleError::Validation(message),
        }
    }
}

impl From<BalanceError> for LifecycleError {
    fn from(error: BalanceError) -> Self {
        LifecycleError::IntegrityViolation(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_port_errors_are_retried() {
        let transient = LifecycleError::from(PortError::connection("pool timed out"));
        assert_eq!(transient.retry_class(), RetryClass::Transient);

        let conflict = LifecycleError::from(PortError::conflict("deadlock detected"));
        assert_eq!(conflict.retry_class(), RetryClass::Terminal);

        let missing = LifecycleError::from(PortError::not_found("Request", "REQ-1"));
        assert!(matches!(missing, LifecycleError::NotFound { .. }));
    }
}
