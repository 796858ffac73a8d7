//! Row <-> domain conversions

use core_kernel::{BlockId, Company, ExpenseId, Money, RequestId, UserId};
use domain_accounting::{AccountingBlock, BlockCode, BlockStatus, Expense, ExpenseKind, PaymentMethod};
use domain_balance::UserBalance;
use domain_request::{
    NotificationRecord, NotificationStatus, PayoutDetails, PixKeyType, Request, RequestStatus, RequestType,
};

use crate::error::DatabaseError;
use crate::repositories::blocks::BlockStatus as DbBlockStatus;
use crate::repositories::expenses::{ExpenseKind as DbExpenseKind, PaymentMethod as DbPaymentMethod};
use crate::repositories::requests::{
    NotificationStatus as DbNotificationStatus, PixKeyType as DbPixKeyType, RequestStatus as DbRequestStatus,
    RequestType as DbRequestType,
};
use crate::repositories::{BalanceRow, BlockRow, ExpenseRow, RequestRow};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

pub fn request_status_to_db(status: RequestStatus) -> DbRequestStatus {
    match status {
        RequestStatus::Waiting => DbRequestStatus::Waiting,
        RequestStatus::Validates => DbRequestStatus::Validates,
        RequestStatus::Authorizes => DbRequestStatus::Authorizes,
        RequestStatus::Accepts => DbRequestStatus::Accepts,
        RequestStatus::Completed => DbRequestStatus::Completed,
        RequestStatus::Denied => DbRequestStatus::Denied,
    }
}

fn request_status_from_db(status: DbRequestStatus) -> RequestStatus {
    match status {
        DbRequestStatus::Waiting => RequestStatus::Waiting,
        DbRequestStatus::Validates => RequestStatus::Validates,
        DbRequestStatus::Authorizes => RequestStatus::Authorizes,
        DbRequestStatus::Accepts => RequestStatus::Accepts,
        DbRequestStatus::Completed => RequestStatus::Completed,
        DbRequestStatus::Denied => RequestStatus::Denied,
    }
}

pub fn request_type_to_db(request_type: RequestType) -> DbRequestType {
    match request_type {
        RequestType::Deposit => DbRequestType::Deposit,
        RequestType::Reimbursement => DbRequestType::Reimbursement,
    }
}

fn request_type_from_db(request_type: DbRequestType) -> RequestType {
    match request_type {
        DbRequestType::Deposit => RequestType::Deposit,
        DbRequestType::Reimbursement => RequestType::Reimbursement,
    }
}

fn pix_key_type_to_db(key_type: PixKeyType) -> DbPixKeyType {
    match key_type {
        PixKeyType::Cpf => DbPixKeyType::Cpf,
        PixKeyType::Cnpj => DbPixKeyType::Cnpj,
        PixKeyType::Email => DbPixKeyType::Email,
        PixKeyType::Phone => DbPixKeyType::Phone,
        PixKeyType::Random => DbPixKeyType::Random,
    }
}

fn pix_key_type_from_db(key_type: DbPixKeyType) -> PixKeyType {
    match key_type {
        DbPixKeyType::Cpf => PixKeyType::Cpf,
        DbPixKeyType::Cnpj => PixKeyType::Cnpj,
        DbPixKeyType::Email => PixKeyType::Email,
        DbPixKeyType::Phone => PixKeyType::Phone,
        DbPixKeyType::Random => PixKeyType::Random,
    }
}

pub fn block_status_to_db(status: BlockStatus) -> DbBlockStatus {
    match status {
        BlockStatus::Open => DbBlockStatus::Open,
        BlockStatus::Approved => DbBlockStatus::Approved,
        BlockStatus::Denied => DbBlockStatus::Denied,
        BlockStatus::Closed => DbBlockStatus::Closed,
    }
}

fn block_status_from_db(status: DbBlockStatus) -> BlockStatus {
    match status {
        DbBlockStatus::Open => BlockStatus::Open,
        DbBlockStatus::Approved => BlockStatus::Approved,
        DbBlockStatus::Denied => BlockStatus::Denied,
        DbBlockStatus::Closed => BlockStatus::Closed,
    }
}

fn expense_kind_to_db(kind: ExpenseKind) -> DbExpenseKind {
    match kind {
        ExpenseKind::Credit => DbExpenseKind::Credit,
        ExpenseKind::Debit => DbExpenseKind::Debit,
        ExpenseKind::Reimbursement => DbExpenseKind::Reimbursement,
    }
}

fn expense_kind_from_db(kind: DbExpenseKind) -> ExpenseKind {
    match kind {
        DbExpenseKind::Credit => ExpenseKind::Credit,
        DbExpenseKind::Debit => ExpenseKind::Debit,
        DbExpenseKind::Reimbursement => ExpenseKind::Reimbursement,
    }
}

fn payment_method_to_db(method: PaymentMethod) -> DbPaymentMethod {
    match method {
        PaymentMethod::Pix => DbPaymentMethod::Pix,
        PaymentMethod::Cash => DbPaymentMethod::Cash,
        PaymentMethod::CreditCard => DbPaymentMethod::CreditCard,
        PaymentMethod::DebitCard => DbPaymentMethod::DebitCard,
        PaymentMethod::BankTransfer => DbPaymentMethod::BankTransfer,
        PaymentMethod::Other => DbPaymentMethod::Other,
    }
}

fn payment_method_from_db(method: DbPaymentMethod) -> PaymentMethod {
    match method {
        DbPaymentMethod::Pix => PaymentMethod::Pix,
        DbPaymentMethod::Cash => PaymentMethod::Cash,
        DbPaymentMethod::CreditCard => PaymentMethod::CreditCard,
        DbPaymentMethod::DebitCard => PaymentMethod::DebitCard,
        DbPaymentMethod::BankTransfer => PaymentMethod::BankTransfer,
        DbPaymentMethod::Other => PaymentMethod::Other,
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub fn request_to_row(request: &Request) -> RequestRow {
    let notification = request.notification.as_ref();
    RequestRow {
        request_id: *request.id.as_uuid(),
        request_type: request_type_to_db(request.request_type),
        status: request_status_to_db(request.status),
        amount: request.amount.amount(),
        current_balance: request.current_balance.amount(),
        initial_user_balance: request.initial_user_balance.amount(),
        balance_deducted: request.balance_deducted.amount(),
        company: request.company.as_str().to_string(),
        requester_id: *request.requester_id.as_uuid(),
        validator_id: *request.validator_id.as_uuid(),
        authorizer_id: request.authorizer_id.map(Into::into),
        bank: request.payout.bank.clone(),
        agency: request.payout.agency.clone(),
        account: request.payout.account.clone(),
        pix_key: request.payout.pix_key.clone(),
        pix_key_type: request.payout.pix_key_type.map(pix_key_type_to_db),
        description: request.description.clone(),
        denial_reason: request.denial_reason.clone(),
        proof_of_payment: request.proof_of_payment.clone(),
        notification_id: notification.and_then(|n| n.message_id.clone()),
        notification_status: notification.map(|n| match n.status {
            NotificationStatus::Sent => DbNotificationStatus::Sent,
            NotificationStatus::Error => DbNotificationStatus::Error,
        }),
        notification_error: notification.and_then(|n| n.error.clone()),
        origin_block_id: request.origin_block.map(Into::into),
        created_at: request.created_at,
        updated_at: request.updated_at,
    }
}

pub fn request_from_row(row: RequestRow) -> Request {
    let notification = row.notification_status.map(|status| NotificationRecord {
        message_id: row.notification_id.clone(),
        status: match status {
            DbNotificationStatus::Sent => NotificationStatus::Sent,
            DbNotificationStatus::Error => NotificationStatus::Error,
        },
        error: row.notification_error.clone(),
    });

    Request {
        id: RequestId::from_uuid(row.request_id),
        request_type: request_type_from_db(row.request_type),
        status: request_status_from_db(row.status),
        amount: Money::new(row.amount),
        current_balance: Money::new(row.current_balance),
        initial_user_balance: Money::new(row.initial_user_balance),
        balance_deducted: Money::new(row.balance_deducted),
        company: Company::new(row.company),
        requester_id: UserId::from_uuid(row.requester_id),
        validator_id: UserId::from_uuid(row.validator_id),
        authorizer_id: row.authorizer_id.map(UserId::from_uuid),
        payout: PayoutDetails {
            bank: row.bank,
            agency: row.agency,
            account: row.account,
            pix_key: row.pix_key,
            pix_key_type: row.pix_key_type.map(pix_key_type_from_db),
        },
        description: row.description,
        denial_reason: row.denial_reason,
        proof_of_payment: row.proof_of_payment,
        notification,
        origin_block: row.origin_block_id.map(BlockId::from_uuid),
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

// ---------------------------------------------------------------------------
// Balances
// ---------------------------------------------------------------------------

pub fn balance_to_row(balance: &UserBalance) -> BalanceRow {
    BalanceRow {
        user_id: *balance.user_id.as_uuid(),
        company: balance.company.as_str().to_string(),
        balance: balance.balance.amount(),
        created_at: balance.created_at,
        updated_at: balance.updated_at,
    }
}

pub fn balance_from_row(row: BalanceRow) -> UserBalance {
    UserBalance {
        user_id: UserId::from_uuid(row.user_id),
        company: Company::new(row.company),
        balance: Money::new(row.balance),
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

pub fn block_to_row(block: &AccountingBlock) -> BlockRow {
    BlockRow {
        block_id: *block.id.as_uuid(),
        code: block.code.to_string(),
        status: block_status_to_db(block.status),
        request_id: block.request_id.map(Into::into),
        responsible_id: *block.responsible_id.as_uuid(),
        company: block.company.as_str().to_string(),
        initial_amount: block.initial_amount.amount(),
        current_balance: block.current_balance.amount(),
        saldo_final: block.saldo_final.map(|m| m.amount()),
        pdf_url: block.pdf_url.clone(),
        created_at: block.created_at,
        updated_at: block.updated_at,
        closed_at: block.closed_at,
    }
}

pub fn block_from_row(row: BlockRow) -> Result<AccountingBlock, DatabaseError> {
    let code = BlockCode::parse(&row.code)
        .map_err(|e| DatabaseError::invalid_data(format!("block {}: {}", row.block_id, e)))?;

    Ok(AccountingBlock {
        id: BlockId::from_uuid(row.block_id),
        code,
        status: block_status_from_db(row.status),
        request_id: row.request_id.map(RequestId::from_uuid),
        responsible_id: UserId::from_uuid(row.responsible_id),
        company: Company::new(row.company),
        initial_amount: Money::new(row.initial_amount),
        current_balance: Money::new(row.current_balance),
        saldo_final: row.saldo_final.map(Money::new),
        pdf_url: row.pdf_url,
        created_at: row.created_at,
        updated_at: row.updated_at,
        closed_at: row.closed_at,
    })
}

// ---------------------------------------------------------------------------
// Expenses
// ---------------------------------------------------------------------------

pub fn expense_to_row(expense: &Expense) -> ExpenseRow {
    ExpenseRow {
        expense_id: *expense.id.as_uuid(),
        block_id: *expense.block_id.as_uuid(),
        company: expense.company.as_str().to_string(),
        created_by: *expense.created_by.as_uuid(),
        amount: expense.amount.amount(),
        category: expense.category.clone(),
        payment_method: payment_method_to_db(expense.payment_method),
        expense_date: expense.date,
        kind: expense_kind_to_db(expense.kind),
        description: expense.description.clone(),
        image_urls: expense.image_urls.clone(),
        created_at: expense.created_at,
        updated_at: expense.updated_at,
    }
}

pub fn expense_from_row(row: ExpenseRow) -> Expense {
    Expense {
        id: ExpenseId::from_uuid(row.expense_id),
        block_id: BlockId::from_uuid(row.block_id),
        company: Company::new(row.company),
        created_by: UserId::from_uuid(row.created_by),
        amount: Money::new(row.amount),
        category: row.category,
        payment_method: payment_method_from_db(row.payment_method),
        date: row.expense_date,
        kind: expense_kind_from_db(row.kind),
        description: row.description,
        image_urls: row.image_urls,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain_request::NewRequest;
    use rust_decimal_macros::dec;

    #[test]
    fn test_request_row_preserves_notification_and_payout() {
        let mut request = Request::new(
            NewRequest {
                amount: Money::new(dec!(250.40)),
                company: Company::new("Acme"),
                requester_id: UserId::new(),
                validator_id: UserId::new(),
                payout: PayoutDetails::bank_account("341", "0001", "12345-6"),
                description: None,
            },
            Money::new(dec!(-20)),
            Utc::now(),
        )
        .unwrap();
        request.record_notification(NotificationRecord::failed("timeout"));

        let restored = request_from_row(request_to_row(&request));

        assert_eq!(restored, request);
    }

    #[test]
    fn test_corrupt_block_code_is_invalid_data() {
        let request = Request::new(
            NewRequest {
                amount: Money::new(dec!(10)),
                company: Company::new("Acme"),
                requester_id: UserId::new(),
                validator_id: UserId::new(),
                payout: PayoutDetails::pix("a@b.c", PixKeyType::Email),
                description: None,
            },
            Money::zero(),
            Utc::now(),
        )
        .unwrap();
        let block = AccountingBlock::open_for(&request, BlockCode::first(), Money::new(dec!(10)), Utc::now());
        let mut row = block_to_row(&block);
        row.code = "PRC".to_string();

        assert!(matches!(block_from_row(row), Err(DatabaseError::InvalidData(_))));
    }
}
