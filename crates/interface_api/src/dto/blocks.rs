//! Accounting block and expense DTOs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{Company, Money, UserId};
use domain_accounting::{
    AccountingBlock, BlockStatus, BlockSummary, Expense, ExpenseKind, ExpenseUpdate, NewExpense,
    PaymentMethod,
};
use domain_lifecycle::{BlockDetails, BlockFilter, CloseOutcome, ReimbursementResult};

use super::positive_amount;
use super::requests::RequestResponse;

#[derive(Debug, Default, Deserialize)]
pub struct ListBlocksQuery {
    pub status: Option<BlockStatus>,
    pub company: Option<String>,
    pub responsible_id: Option<Uuid>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl From<ListBlocksQuery> for BlockFilter {
    fn from(query: ListBlocksQuery) -> Self {
        BlockFilter {
            status: query.status,
            company: query.company.map(Company::new),
            responsible_id: query.responsible_id.map(UserId::from_uuid),
            limit: query.limit,
            offset: query.offset,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub credits: Decimal,
    pub debits: Decimal,
    pub reimbursements: Decimal,
    pub saldo: Decimal,
    pub expense_count: usize,
}

impl From<BlockSummary> for SummaryResponse {
    fn from(summary: BlockSummary) -> Self {
        Self {
            credits: summary.credits.amount(),
            debits: summary.debits.amount(),
            reimbursements: summary.reimbursements.amount(),
            saldo: summary.saldo.amount(),
            expense_count: summary.expense_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BlockResponse {
    pub id: Uuid,
    pub code: String,
    pub status: BlockStatus,
    pub request_id: Option<Uuid>,
    pub responsible_id: Uuid,
    pub company: String,
    pub initial_amount: Decimal,
    pub current_balance: Decimal,
    pub saldo_final: Option<Decimal>,
    pub pdf_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SummaryResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl From<AccountingBlock> for BlockResponse {
    fn from(block: AccountingBlock) -> Self {
        Self {
            id: *block.id.as_uuid(),
            code: block.code.to_string(),
            status: block.status,
            request_id: block.request_id.map(Into::into),
            responsible_id: *block.responsible_id.as_uuid(),
            company: block.company.as_str().to_string(),
            initial_amount: block.initial_amount.amount(),
            current_balance: block.current_balance.amount(),
            saldo_final: block.saldo_final.map(|m| m.amount()),
            pdf_url: block.pdf_url,
            summary: None,
            created_at: block.created_at,
            updated_at: block.updated_at,
            closed_at: block.closed_at,
        }
    }
}

impl From<BlockDetails> for BlockResponse {
    fn from(details: BlockDetails) -> Self {
        let mut response = BlockResponse::from(details.block);
        response.summary = Some(details.summary.into());
        response
    }
}

/// Result of a close attempt
///
/// Both variants are answered with 200; clients branch on `outcome` and offer
/// the reimbursement action for `awaiting_reimbursement`.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CloseResponse {
    Closed {
        block: BlockResponse,
        saldo_final: Decimal,
        pdf_url: String,
        deleted_request_id: Option<Uuid>,
    },
    AwaitingReimbursement {
        block_id: Uuid,
        saldo: Decimal,
        message: String,
    },
}

impl From<CloseOutcome> for CloseResponse {
    fn from(outcome: CloseOutcome) -> Self {
        match outcome {
            CloseOutcome::Closed {
                block,
                saldo_final,
                pdf_url,
                deleted_request,
            } => CloseResponse::Closed {
                block: block.into(),
                saldo_final: saldo_final.amount(),
                pdf_url,
                deleted_request_id: deleted_request.map(Into::into),
            },
            CloseOutcome::AwaitingReimbursement { block_id, saldo, message } => {
                CloseResponse::AwaitingReimbursement {
                    block_id: block_id.into(),
                    saldo: saldo.amount(),
                    message,
                }
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReimbursementResponse {
    pub request: RequestResponse,
    pub block: BlockResponse,
}

impl From<ReimbursementResult> for ReimbursementResponse {
    fn from(result: ReimbursementResult) -> Self {
        Self {
            request: result.request.into(),
            block: result.block.into(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ExpenseBody {
    #[validate(custom(function = "positive_amount"))]
    pub amount: Decimal,
    #[validate(length(min = 1, max = 120, message = "category is required"))]
    pub category: String,
    pub payment_method: PaymentMethod,
    pub date: NaiveDate,
    pub kind: ExpenseKind,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[serde(default)]
    #[validate(length(max = 3, message = "at most 3 receipt images"))]
    pub image_urls: Vec<String>,
}

impl From<ExpenseBody> for NewExpense {
    fn from(body: ExpenseBody) -> Self {
        NewExpense {
            amount: Money::new(body.amount),
            category: body.category,
            payment_method: body.payment_method,
            date: body.date,
            kind: body.kind,
            description: body.description,
            image_urls: body.image_urls,
        }
    }
}

/// Partial expense edit; omitted fields keep their value
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateExpenseBody {
    pub amount: Option<Decimal>,
    #[validate(length(min = 1, max = 120))]
    pub category: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub date: Option<NaiveDate>,
    pub kind: Option<ExpenseKind>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(length(max = 3, message = "at most 3 receipt images"))]
    pub image_urls: Option<Vec<String>>,
}

impl From<UpdateExpenseBody> for ExpenseUpdate {
    fn from(body: UpdateExpenseBody) -> Self {
        ExpenseUpdate {
            amount: body.amount.map(Money::new),
            category: body.category,
            payment_method: body.payment_method,
            date: body.date,
            kind: body.kind,
            description: body.description,
            image_urls: body.image_urls,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExpenseResponse {
    pub id: Uuid,
    pub block_id: Uuid,
    pub company: String,
    pub created_by: Uuid,
    pub amount: Decimal,
    /// Effect on the block balance: negative for debits
    pub signed_amount: Decimal,
    pub category: String,
    pub payment_method: PaymentMethod,
    pub date: NaiveDate,
    pub kind: ExpenseKind,
    pub description: Option<String>,
    pub image_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Expense> for ExpenseResponse {
    fn from(expense: Expense) -> Self {
        let signed_amount = expense.signed_effect().amount();
        Self {
            id: *expense.id.as_uuid(),
            block_id: *expense.block_id.as_uuid(),
            company: expense.company.as_str().to_string(),
            created_by: *expense.created_by.as_uuid(),
            amount: expense.amount.amount(),
            signed_amount,
            category: expense.category,
            payment_method: expense.payment_method,
            date: expense.date,
            kind: expense.kind,
            description: expense.description,
            image_urls: expense.image_urls,
            created_at: expense.created_at,
            updated_at: expense.updated_at,
        }
    }
}
