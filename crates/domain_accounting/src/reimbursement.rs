//! Reimbursement planning
//!
//! Raising a reimbursement is a deliberate user action taken on a block that
//! was refused a close; it is never triggered by the close itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{BlockId, Money};
use domain_request::{Request, RequestError};
use crate::block::{AccountingBlock, BlockStatus};
use crate::closing::BlockSummary;
use crate::error::AccountingError;

/// A validated intent to recover a negative block balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReimbursementPlan {
    pub block_id: BlockId,
    pub amount: Money,
    pub description: String,
}

impl ReimbursementPlan {
    pub fn for_block(block: &AccountingBlock, summary: &BlockSummary) -> Result<Self, AccountingError> {
        match block.status {
            BlockStatus::Open => {}
            BlockStatus::Approved => {
                return Err(AccountingError::ReimbursementAlreadyInitiated {
                    code: block.code.to_string(),
                })
            }
            BlockStatus::Closed => {
                return Err(AccountingError::BlockClosed {
                    code: block.code.to_string(),
                })
            }
            BlockStatus::Denied => {
                return Err(AccountingError::InvalidStatus {
                    code: block.code.to_string(),
                    status: block.status,
                    action: "request a reimbursement",
                })
            }
        }

        if !summary.is_negative() {
            return Err(AccountingError::NothingToReimburse { saldo: summary.saldo });
        }

        Ok(Self {
            block_id: block.id,
            amount: summary.saldo.abs(),
            description: format!("Reembolso do bloco {}", block.code),
        })
    }

    /// Builds the REIMBURSEMENT request from the block's original request
    pub fn into_request(
        self,
        origin: &Request,
        ledger_snapshot: Money,
        now: DateTime<Utc>,
    ) -> Result<Request, RequestError> {
        Request::reimbursement_of(origin, self.block_id, self.amount, ledger_snapshot, self.description, now)
    }
}
