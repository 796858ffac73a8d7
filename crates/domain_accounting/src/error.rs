//! Accounting domain errors

use thiserror::Error;

use core_kernel::{ExpenseId, Money, MoneyError, UserId};
use crate::block::BlockStatus;

/// Errors that can occur in the accounting domain
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountingError {
    /// A stored block code does not follow the `NN-PRC` format
    #[error("Invalid block code: {0}")]
    InvalidBlockCode(String),

    /// The block is CLOSED
    #[error("Block {code} is closed")]
    BlockClosed { code: String },

    /// The block is in a state that does not allow the action
    #[error("Block {code} is {status} and cannot {action}")]
    InvalidStatus {
        code: String,
        status: BlockStatus,
        action: &'static str,
    },

    /// Only the creator of an expense may change it
    #[error("User {actor} did not create expense {expense_id}")]
    NotCreator { expense_id: ExpenseId, actor: UserId },

    /// Expense data failed validation
    #[error("Invalid expense: {0}")]
    InvalidExpense(String),

    /// The running balance no longer matches the recorded expenses
    #[error("Block {code} balance drift: recorded {recorded}, expenses imply {expected}")]
    BalanceDrift {
        code: String,
        recorded: Money,
        expected: Money,
    },

    /// A reimbursement needs a negative block balance
    #[error("Block balance is {saldo}; only negative balances can be reimbursed")]
    NothingToReimburse { saldo: Money },

    /// A reimbursement request already exists for the block
    #[error("Reimbursement already initiated for block {code}")]
    ReimbursementAlreadyInitiated { code: String },

    #[error("Money error: {0}")]
    Money(#[from] MoneyError),
}

impl AccountingError {
    pub fn invalid_expense(message: impl Into<String>) -> Self {
        AccountingError::InvalidExpense(message.into())
    }
}
