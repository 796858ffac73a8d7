//! Custom Test Assertions
//!
//! Assertion helpers for lifecycle types that print the figures involved
//! instead of a bare `left != right`.

use core_kernel::Money;
use domain_accounting::{AccountingBlock, BlockStatus, Expense};
use domain_request::Request;

/// Asserts the funding invariant: what was drawn plus what remains is the
/// requested amount
pub fn assert_funding_consistent(request: &Request) {
    let total = request.balance_deducted + request.current_balance;
    assert_eq!(
        total.amount(),
        request.amount.amount(),
        "Request {}: deducted {} + remaining {} != amount {}",
        request.id,
        request.balance_deducted,
        request.current_balance,
        request.amount
    );
}

/// Asserts a block's running balance equals its initial amount plus the
/// signed effect of `expenses`
pub fn assert_block_reconciles(block: &AccountingBlock, expenses: &[Expense]) {
    let expected: Money = block.initial_amount + expenses.iter().map(Expense::signed_effect).sum::<Money>();
    assert_eq!(
        block.current_balance.amount(),
        expected.amount(),
        "Block {}: running balance {} does not match initial {} plus {} expenses",
        block.code,
        block.current_balance,
        block.initial_amount,
        expenses.len()
    );
}

/// Asserts a block is closed with a statement URL and final balance
pub fn assert_block_closed(block: &AccountingBlock) {
    assert_eq!(block.status, BlockStatus::Closed, "Block {} is {}", block.code, block.status);
    assert!(block.pdf_url.is_some(), "Closed block {} has no statement URL", block.code);
    assert!(block.saldo_final.is_some(), "Closed block {} has no final balance", block.code);
    assert!(block.closed_at.is_some(), "Closed block {} has no close time", block.code);
}
