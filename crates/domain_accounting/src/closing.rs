//! Close-out rules
//!
//! A block whose expenses net out negative owes money back to the company.
//! It may only close once a reimbursement entry has been recorded against it.

use serde::{Deserialize, Serialize};
use tracing::error;

use core_kernel::Money;
use domain_request::Request;
use crate::block::AccountingBlock;
use crate::error::AccountingError;
use crate::expense::{Expense, ExpenseKind};

/// Shown verbatim when a close is refused for a negative balance
pub const NEGATIVE_BALANCE_MESSAGE: &str =
    "Bloco com saldo negativo. Adicione um reembolso para poder fechar.";

/// Totals of a block's expenses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlockSummary {
    pub credits: Money,
    pub debits: Money,
    pub reimbursements: Money,
    /// credits + reimbursements - debits
    pub saldo: Money,
    pub expense_count: usize,
}

impl BlockSummary {
    pub fn from_expenses(expenses: &[Expense]) -> Self {
        let total = |kind: ExpenseKind| -> Money {
            expenses
                .iter()
                .filter(|e| e.kind == kind)
                .map(|e| e.amount)
                .sum()
        };

        let credits = total(ExpenseKind::Credit);
        let debits = total(ExpenseKind::Debit);
        let reimbursements = total(ExpenseKind::Reimbursement);

        Self {
            credits,
            debits,
            reimbursements,
            saldo: credits + reimbursements - debits,
            expense_count: expenses.len(),
        }
    }

    pub fn has_reimbursement(&self) -> bool {
        self.reimbursements.is_positive()
    }

    pub fn is_negative(&self) -> bool {
        self.saldo.is_negative()
    }
}

/// Whether a block may close
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum CloseDecision {
    Ready { summary: BlockSummary },
    AwaitingReimbursement { saldo: Money, message: String },
}

/// Checks that the running balance agrees with the expenses
pub fn reconcile(block: &AccountingBlock, summary: &BlockSummary) -> Result<(), AccountingError> {
    let expected = block.initial_amount.checked_add(summary.saldo)?;
    if block.current_balance != expected {
        error!(
            block_id = %block.id,
            code = %block.code,
            recorded = %block.current_balance,
            expected = %expected,
            "Block running balance does not match its expenses"
        );
        return Err(AccountingError::BalanceDrift {
            code: block.code.to_string(),
            recorded: block.current_balance,
            expected,
        });
    }
    Ok(())
}

/// Decides whether `block` may close given its current expenses
pub fn evaluate_close(block: &AccountingBlock, expenses: &[Expense]) -> Result<CloseDecision, AccountingError> {
    block.ensure_not_closed()?;

    let summary = BlockSummary::from_expenses(expenses);
    if summary.is_negative() && !summary.has_reimbursement() {
        return Ok(CloseDecision::AwaitingReimbursement {
            saldo: summary.saldo,
            message: NEGATIVE_BALANCE_MESSAGE.to_string(),
        });
    }

    reconcile(block, &summary)?;
    Ok(CloseDecision::Ready { summary })
}

/// Everything the document generator needs to print a closing statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosingStatement {
    pub block: AccountingBlock,
    pub expenses: Vec<Expense>,
    pub request: Option<Request>,
    pub summary: BlockSummary,
}

impl ClosingStatement {
    pub fn new(block: AccountingBlock, mut expenses: Vec<Expense>, request: Option<Request>) -> Self {
        expenses.sort_by(|a, b| a.date.cmp(&b.date).then(a.created_at.cmp(&b.created_at)));
        let summary = BlockSummary::from_expenses(&expenses);
        Self {
            block,
            expenses,
            request,
            summary,
        }
    }

    /// Balance the statement reports as final
    pub fn saldo_final(&self) -> Money {
        self.block.current_balance
    }

    pub fn filename(&self) -> String {
        format!(
            "fechamento-{}-{}.pdf",
            self.block.code,
            self.block.id.as_uuid().simple()
        )
    }
}
