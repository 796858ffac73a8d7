//! Accounting Block Domain
//!
//! An accounting block is the expense ledger opened when a request is
//! accepted. Employees record what they spend (and any cash they hand back)
//! against it; finance closes it once the balance is settled.
//!
//! # Block Lifecycle
//!
//! ```text
//! OPEN ----------------------------> CLOSED
//!   \-> APPROVED (reimbursement) --/
//! ```
//!
//! A block whose expenses leave it negative cannot close until a
//! reimbursement entry has been recorded against it.

pub mod code;
pub mod expense;
pub mod block;
pub mod closing;
pub mod reimbursement;
pub mod error;

pub use code::BlockCode;
pub use expense::{Expense, ExpenseKind, ExpenseUpdate, ExpenseRevision, NewExpense, PaymentMethod, MAX_RECEIPT_IMAGES};
pub use block::{AccountingBlock, BlockStatus};
pub use closing::{
    BlockSummary, CloseDecision, ClosingStatement, evaluate_close, reconcile,
    NEGATIVE_BALANCE_MESSAGE,
};
pub use reimbursement::ReimbursementPlan;
pub use error::AccountingError;
