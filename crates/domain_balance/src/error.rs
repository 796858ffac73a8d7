//! Balance domain errors

use core_kernel::{Money, MoneyError};
use thiserror::Error;

/// Errors that can occur while moving a ledger balance
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BalanceError {
    #[error("Ledger movements must not be negative, got {0}")]
    NegativeMovement(Money),

    #[error("Balance arithmetic failed: {0}")]
    Arithmetic(#[from] MoneyError),
}
