//! Accounting block aggregate
//!
//! # Invariants
//!
//! - `current_balance = initial_amount + Σ signed(expense)` at all times
//! - A block is CLOSED at most once; `saldo_final` and `pdf_url` are only set
//!   on close, when the link to the request is dropped

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{BlockId, Company, Money, RequestId, UserId};
use domain_request::Request;
use crate::code::BlockCode;
use crate::error::AccountingError;
use crate::expense::{Expense, ExpenseRevision};

/// Block lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockStatus {
    Open,
    /// A reimbursement request has been raised for the block
    Approved,
    Denied,
    Closed,
}

impl BlockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockStatus::Open => "OPEN",
            BlockStatus::Approved => "APPROVED",
            BlockStatus::Denied => "DENIED",
            BlockStatus::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for BlockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BlockStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OPEN" => Ok(BlockStatus::Open),
            "APPROVED" => Ok(BlockStatus::Approved),
            "DENIED" => Ok(BlockStatus::Denied),
            "CLOSED" => Ok(BlockStatus::Closed),
            other => Err(format!("unknown block status '{}'", other)),
        }
    }
}

/// The expense ledger of one accepted request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountingBlock {
    pub id: BlockId,
    pub code: BlockCode,
    pub status: BlockStatus,
    pub request_id: Option<RequestId>,
    /// Requester of the owning request; kept after close for the record
    pub responsible_id: UserId,
    pub company: Company,
    pub initial_amount: Money,
    pub current_balance: Money,
    pub saldo_final: Option<Money>,
    pub pdf_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl AccountingBlock {
    /// Opens a block for an accepted request
    ///
    /// `initial_amount` is the request's remaining balance before the ledger
    /// draw of the accepting transition.
    pub fn open_for(request: &Request, code: BlockCode, initial_amount: Money, now: DateTime<Utc>) -> Self {
        Self {
            id: BlockId::new(),
            code,
            status: BlockStatus::Open,
            request_id: Some(request.id),
            responsible_id: request.requester_id,
            company: request.company.clone(),
            initial_amount,
            current_balance: initial_amount,
            saldo_final: None,
            pdf_url: None,
            created_at: now,
            updated_at: now,
            closed_at: None,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.status == BlockStatus::Closed
    }

    fn closed_error(&self) -> AccountingError {
        AccountingError::BlockClosed {
            code: self.code.to_string(),
        }
    }

    /// Expenses may be recorded while the block is OPEN or APPROVED
    pub fn ensure_accepts_expenses(&self) -> Result<(), AccountingError> {
        match self.status {
            BlockStatus::Open | BlockStatus::Approved => Ok(()),
            BlockStatus::Closed => Err(self.closed_error()),
            BlockStatus::Denied => Err(AccountingError::InvalidStatus {
                code: self.code.to_string(),
                status: self.status,
                action: "accept expenses",
            }),
        }
    }

    pub fn ensure_not_closed(&self) -> Result<(), AccountingError> {
        if self.is_closed() {
            return Err(self.closed_error());
        }
        Ok(())
    }

    fn shift_balance(&mut self, delta: Money, now: DateTime<Utc>) -> Result<(), AccountingError> {
        self.current_balance = self.current_balance.checked_add(delta)?;
        self.updated_at = now;
        Ok(())
    }

    pub fn record_expense(&mut self, expense: &Expense, now: DateTime<Utc>) -> Result<(), AccountingError> {
        self.ensure_accepts_expenses()?;
        self.shift_balance(expense.signed_effect(), now)
    }

    pub fn revise_expense(&mut self, revision: &ExpenseRevision, now: DateTime<Utc>) -> Result<(), AccountingError> {
        self.ensure_accepts_expenses()?;
        self.shift_balance(revision.block_delta(), now)
    }

    pub fn remove_expense(&mut self, expense: &Expense, now: DateTime<Utc>) -> Result<(), AccountingError> {
        self.ensure_accepts_expenses()?;
        self.shift_balance(-expense.signed_effect(), now)
    }

    /// Marks the block as waiting on a reimbursement request
    pub fn mark_reimbursement_requested(&mut self, now: DateTime<Utc>) -> Result<(), AccountingError> {
        match self.status {
            BlockStatus::Open => {
                self.status = BlockStatus::Approved;
                self.updated_at = now;
                Ok(())
            }
            BlockStatus::Approved => Err(AccountingError::ReimbursementAlreadyInitiated {
                code: self.code.to_string(),
            }),
            BlockStatus::Closed => Err(self.closed_error()),
            BlockStatus::Denied => Err(AccountingError::InvalidStatus {
                code: self.code.to_string(),
                status: self.status,
                action: "request a reimbursement",
            }),
        }
    }

    /// Closes the block and returns the final balance
    ///
    /// The running balance is the final balance; the request link is dropped
    /// so the request can be deleted.
    pub fn close(&mut self, pdf_url: impl Into<String>, now: DateTime<Utc>) -> Result<Money, AccountingError> {
        self.ensure_not_closed()?;
        self.status = BlockStatus::Closed;
        self.saldo_final = Some(self.current_balance);
        self.pdf_url = Some(pdf_url.into());
        self.request_id = None;
        self.closed_at = Some(now);
        self.updated_at = now;
        Ok(self.current_balance)
    }
}
