//! Property-Based Test Generators
//!
//! Proptest strategies for lifecycle data that respect the domain
//! invariants: positive amounts in centavos, valid codes and submissions.

use chrono::NaiveDate;
use core_kernel::Money;
use domain_accounting::{BlockCode, ExpenseKind, NewExpense, PaymentMethod, MAX_RECEIPT_IMAGES};
use domain_request::RequestStatus;
use proptest::prelude::*;

/// Positive amounts from one centavo to one million reais
pub fn positive_money_strategy() -> impl Strategy<Value = Money> {
    (1i64..100_000_000i64).prop_map(Money::from_cents)
}

/// Signed ledger balances
pub fn ledger_balance_strategy() -> impl Strategy<Value = Money> {
    (-100_000_000i64..100_000_000i64).prop_map(Money::from_cents)
}

pub fn block_code_strategy() -> impl Strategy<Value = BlockCode> {
    (1u32..10_000u32).prop_map(BlockCode::from_sequence)
}

pub fn request_status_strategy() -> impl Strategy<Value = RequestStatus> {
    prop_oneof![
        Just(RequestStatus::Waiting),
        Just(RequestStatus::Validates),
        Just(RequestStatus::Authorizes),
        Just(RequestStatus::Accepts),
        Just(RequestStatus::Completed),
        Just(RequestStatus::Denied),
    ]
}

pub fn expense_kind_strategy() -> impl Strategy<Value = ExpenseKind> {
    prop_oneof![
        Just(ExpenseKind::Credit),
        Just(ExpenseKind::Debit),
        Just(ExpenseKind::Reimbursement),
    ]
}

pub fn payment_method_strategy() -> impl Strategy<Value = PaymentMethod> {
    prop_oneof![
        Just(PaymentMethod::Pix),
        Just(PaymentMethod::Cash),
        Just(PaymentMethod::CreditCard),
        Just(PaymentMethod::DebitCard),
        Just(PaymentMethod::BankTransfer),
        Just(PaymentMethod::Other),
    ]
}

/// Days in 2024
pub fn expense_date_strategy() -> impl Strategy<Value = NaiveDate> {
    (1u32..=366u32).prop_map(|ordinal| NaiveDate::from_yo_opt(2024, ordinal).unwrap_or_default())
}

/// Valid expense submissions
pub fn new_expense_strategy() -> impl Strategy<Value = NewExpense> {
    (
        positive_money_strategy(),
        "[A-Za-z][A-Za-z ]{0,20}",
        payment_method_strategy(),
        expense_date_strategy(),
        expense_kind_strategy(),
        0usize..=MAX_RECEIPT_IMAGES,
    )
        .prop_map(|(amount, category, payment_method, date, kind, images)| NewExpense {
            amount,
            category,
            payment_method,
            date,
            kind,
            description: None,
            image_urls: (0..images).map(|i| format!("https://cdn.example/receipt-{}.jpg", i)).collect(),
        })
}
