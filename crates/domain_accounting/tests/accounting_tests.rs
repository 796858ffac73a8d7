//! Tests for accounting blocks, expenses and close-out rules

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal_macros::dec;

use core_kernel::{Money, UserId};
use domain_accounting::{
    evaluate_close, AccountingBlock, AccountingError, BlockCode, BlockStatus, BlockSummary,
    CloseDecision, ClosingStatement, Expense, ExpenseKind, ExpenseUpdate, NewExpense, PaymentMethod,
    ReimbursementPlan, NEGATIVE_BALANCE_MESSAGE,
};
use domain_request::{Request, RequestStatus, RequestType};
use test_utils::{
    assert_block_reconciles, block_code_strategy, new_expense_strategy, BlockBuilder, ExpenseBuilder,
    PayoutFixtures, RequestBuilder,
};

fn accepted_request(amount: Money) -> Request {
    RequestBuilder::new()
        .with_amount(amount)
        .with_payout(PayoutFixtures::bank_account())
        .build()
        .unwrap()
}

fn open_block(initial: Money) -> (AccountingBlock, Request) {
    let request = accepted_request(Money::new(dec!(500)));
    let block = BlockBuilder::new()
        .with_initial_amount(initial)
        .for_request(request.clone())
        .build()
        .unwrap();
    (block, request)
}

fn new_expense(kind: ExpenseKind, amount: Money) -> NewExpense {
    ExpenseBuilder::new()
        .with_kind(kind)
        .with_amount(amount)
        .with_category("Transporte")
        .with_payment_method(PaymentMethod::CreditCard)
        .with_date(NaiveDate::from_ymd_opt(2024, 6, 3).unwrap())
        .build()
}

fn add(block: &mut AccountingBlock, expenses: &mut Vec<Expense>, kind: ExpenseKind, amount: Money) -> Expense {
    let expense = Expense::record(block, new_expense(kind, amount), block.responsible_id, Utc::now()).unwrap();
    block.record_expense(&expense, Utc::now()).unwrap();
    expenses.push(expense.clone());
    expense
}

// ============================================================================
// Block Code Tests
// ============================================================================

mod code_tests {
    use super::*;

    #[test]
    fn test_first_code_is_01() {
        assert_eq!(BlockCode::next_after(None).unwrap().to_string(), "01-PRC");
    }

    #[test]
    fn test_07_is_followed_by_08() {
        let latest: BlockCode = "07-PRC".parse().unwrap();
        assert_eq!(BlockCode::next_after(Some(&latest)).unwrap().to_string(), "08-PRC");
    }

    #[test]
    fn test_unparseable_latest_is_an_error() {
        assert!(matches!(
            BlockCode::parse("BLOCO-7"),
            Err(AccountingError::InvalidBlockCode(_))
        ));
    }
}

// ============================================================================
// Block Balance Tests
// ============================================================================

mod block_tests {
    use super::*;

    #[test]
    fn test_open_block_copies_request() {
        let (block, request) = open_block(Money::new(dec!(500)));

        assert_eq!(block.status, BlockStatus::Open);
        assert_eq!(block.request_id, Some(request.id));
        assert_eq!(block.company, request.company);
        assert_eq!(block.current_balance, block.initial_amount);
    }

    #[test]
    fn test_running_balance_follows_expense_kinds() {
        let (mut block, _) = open_block(Money::new(dec!(100)));
        let mut expenses = Vec::new();

        add(&mut block, &mut expenses, ExpenseKind::Debit, Money::new(dec!(60)));
        add(&mut block, &mut expenses, ExpenseKind::Credit, Money::new(dec!(20)));
        add(&mut block, &mut expenses, ExpenseKind::Reimbursement, Money::new(dec!(5)));

        assert_eq!(block.current_balance, Money::new(dec!(65)));
    }

    #[test]
    fn test_edit_and_delete_restore_balance() {
        let (mut block, _) = open_block(Money::new(dec!(100)));
        let mut expenses = Vec::new();
        let mut expense = add(&mut block, &mut expenses, ExpenseKind::Debit, Money::new(dec!(30)));

        let revision = expense
            .apply_update(
                ExpenseUpdate {
                    amount: Some(Money::new(dec!(45))),
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap();
        block.revise_expense(&revision, Utc::now()).unwrap();
        assert_eq!(block.current_balance, Money::new(dec!(55)));

        block.remove_expense(&expense, Utc::now()).unwrap();
        assert_eq!(block.current_balance, Money::new(dec!(100)));
    }

    #[test]
    fn test_changing_kind_flips_effect() {
        let (mut block, _) = open_block(Money::new(dec!(100)));
        let mut expenses = Vec::new();
        let mut expense = add(&mut block, &mut expenses, ExpenseKind::Debit, Money::new(dec!(10)));

        let revision = expense
            .apply_update(
                ExpenseUpdate {
                    kind: Some(ExpenseKind::Credit),
                    ..Default::default()
                },
                Utc::now(),
            )
            .unwrap();
        block.revise_expense(&revision, Utc::now()).unwrap();

        assert_eq!(revision.old_amount, revision.new_amount);
        assert_eq!(block.current_balance, Money::new(dec!(110)));
    }

    #[test]
    fn test_invalid_update_leaves_expense_untouched() {
        let (mut block, _) = open_block(Money::new(dec!(100)));
        let mut expenses = Vec::new();
        let mut expense = add(&mut block, &mut expenses, ExpenseKind::Debit, Money::new(dec!(10)));
        let before = expense.clone();

        let result = expense.apply_update(
            ExpenseUpdate {
                amount: Some(Money::new(dec!(12))),
                image_urls: Some(vec!["1".into(), "2".into(), "3".into(), "4".into()]),
                ..Default::default()
            },
            Utc::now(),
        );

        assert!(matches!(result, Err(AccountingError::InvalidExpense(_))));
        assert_eq!(expense, before);
    }

    #[test]
    fn test_only_creator_may_change_expense() {
        let (mut block, _) = open_block(Money::new(dec!(100)));
        let mut expenses = Vec::new();
        let expense = add(&mut block, &mut expenses, ExpenseKind::Debit, Money::new(dec!(10)));

        assert!(expense.ensure_created_by(block.responsible_id).is_ok());
        assert!(matches!(
            expense.ensure_created_by(UserId::new()),
            Err(AccountingError::NotCreator { .. })
        ));
    }

    #[test]
    fn test_closed_block_rejects_expenses() {
        let (mut block, _) = open_block(Money::new(dec!(100)));
        block.close("https://docs.example.com/01.pdf", Utc::now()).unwrap();

        let expense = Expense::record(
            &block,
            new_expense(ExpenseKind::Debit, Money::new(dec!(1))),
            block.responsible_id,
            Utc::now(),
        )
        .unwrap();

        assert!(matches!(
            block.record_expense(&expense, Utc::now()),
            Err(AccountingError::BlockClosed { .. })
        ));
    }

    #[test]
    fn test_close_sets_final_fields_once() {
        let (mut block, _) = open_block(Money::new(dec!(80)));

        let saldo_final = block.close("https://docs.example.com/01.pdf", Utc::now()).unwrap();

        assert_eq!(saldo_final, Money::new(dec!(80)));
        assert_eq!(block.saldo_final, Some(Money::new(dec!(80))));
        assert!(block.request_id.is_none());
        assert!(block.closed_at.is_some());
        assert!(matches!(
            block.close("again.pdf", Utc::now()),
            Err(AccountingError::BlockClosed { .. })
        ));
    }
}

// ============================================================================
// Close Decision Tests
// ============================================================================

mod close_tests {
    use super::*;

    #[test]
    fn test_negative_block_awaits_reimbursement() {
        let (mut block, _) = open_block(Money::zero());
        let mut expenses = Vec::new();
        add(&mut block, &mut expenses, ExpenseKind::Credit, Money::new(dec!(50)));
        add(&mut block, &mut expenses, ExpenseKind::Debit, Money::new(dec!(150)));

        let decision = evaluate_close(&block, &expenses).unwrap();

        assert_eq!(
            decision,
            CloseDecision::AwaitingReimbursement {
                saldo: Money::new(dec!(-100)),
                message: NEGATIVE_BALANCE_MESSAGE.to_string(),
            }
        );
    }

    #[test]
    fn test_any_reimbursement_unlocks_close() {
        let (mut block, _) = open_block(Money::zero());
        let mut expenses = Vec::new();
        add(&mut block, &mut expenses, ExpenseKind::Debit, Money::new(dec!(100)));
        add(&mut block, &mut expenses, ExpenseKind::Reimbursement, Money::new(dec!(1)));

        let decision = evaluate_close(&block, &expenses).unwrap();

        assert!(matches!(decision, CloseDecision::Ready { .. }));
    }

    #[test]
    fn test_non_negative_block_is_ready() {
        let (mut block, _) = open_block(Money::new(dec!(200)));
        let mut expenses = Vec::new();
        add(&mut block, &mut expenses, ExpenseKind::Credit, Money::new(dec!(200)));
        add(&mut block, &mut expenses, ExpenseKind::Debit, Money::new(dec!(200)));

        match evaluate_close(&block, &expenses).unwrap() {
            CloseDecision::Ready { summary } => {
                assert!(summary.saldo.is_zero());
                assert_eq!(summary.expense_count, 2);
            }
            other => panic!("expected Ready, got {:?}", other),
        }
    }

    #[test]
    fn test_drift_fails_closed() {
        let block = BlockBuilder::new()
            .with_initial_amount(Money::new(dec!(100)))
            .with_current_balance(Money::new(dec!(999)))
            .build()
            .unwrap();

        let result = evaluate_close(&block, &[]);

        assert!(matches!(result, Err(AccountingError::BalanceDrift { .. })));
    }

    #[test]
    fn test_closed_block_cannot_be_evaluated() {
        let (mut block, _) = open_block(Money::zero());
        block.close("x.pdf", Utc::now()).unwrap();

        assert!(matches!(
            evaluate_close(&block, &[]),
            Err(AccountingError::BlockClosed { .. })
        ));
    }

    #[test]
    fn test_statement_orders_expenses_by_date() {
        let (mut block, request) = open_block(Money::zero());
        let mut later = new_expense(ExpenseKind::Debit, Money::new(dec!(5)));
        later.date = NaiveDate::from_ymd_opt(2024, 6, 20).unwrap();
        let mut earlier = new_expense(ExpenseKind::Credit, Money::new(dec!(5)));
        earlier.date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        let expenses = vec![
            Expense::record(&block, later, block.responsible_id, Utc::now()).unwrap(),
            Expense::record(&block, earlier, block.responsible_id, Utc::now()).unwrap(),
        ];
        block.current_balance = Money::zero();

        let statement = ClosingStatement::new(block, expenses, Some(request));

        assert_eq!(statement.expenses[0].kind, ExpenseKind::Credit);
        assert!(statement.filename().starts_with("fechamento-01-PRC-"));
    }
}

// ============================================================================
// Reimbursement Tests
// ============================================================================

mod reimbursement_tests {
    use super::*;

    #[test]
    fn test_plan_for_negative_block() {
        let (mut block, request) = open_block(Money::zero());
        let mut expenses = Vec::new();
        add(&mut block, &mut expenses, ExpenseKind::Debit, Money::new(dec!(100)));
        let summary = BlockSummary::from_expenses(&expenses);

        let plan = ReimbursementPlan::for_block(&block, &summary).unwrap();
        let reimbursement = plan.into_request(&request, Money::new(dec!(-100)), Utc::now()).unwrap();

        assert_eq!(reimbursement.amount, Money::new(dec!(100)));
        assert_eq!(reimbursement.request_type, RequestType::Reimbursement);
        assert_eq!(reimbursement.status, RequestStatus::Authorizes);
        assert_eq!(reimbursement.origin_block, Some(block.id));
        assert_eq!(reimbursement.description.as_deref(), Some("Reembolso do bloco 01-PRC"));
    }

    #[test]
    fn test_positive_block_has_nothing_to_reimburse() {
        let (mut block, _) = open_block(Money::zero());
        let mut expenses = Vec::new();
        add(&mut block, &mut expenses, ExpenseKind::Credit, Money::new(dec!(10)));

        let result = ReimbursementPlan::for_block(&block, &BlockSummary::from_expenses(&expenses));

        assert!(matches!(result, Err(AccountingError::NothingToReimburse { .. })));
    }

    #[test]
    fn test_second_reimbursement_is_rejected() {
        let (mut block, _) = open_block(Money::zero());
        let mut expenses = Vec::new();
        add(&mut block, &mut expenses, ExpenseKind::Debit, Money::new(dec!(10)));
        block.mark_reimbursement_requested(Utc::now()).unwrap();

        let result = ReimbursementPlan::for_block(&block, &BlockSummary::from_expenses(&expenses));

        assert!(matches!(result, Err(AccountingError::ReimbursementAlreadyInitiated { .. })));
        assert_eq!(block.status, BlockStatus::Approved);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #[test]
    fn prop_running_balance_reconciles(
        initial_cents in 0i64..1_000_000,
        submissions in prop::collection::vec(new_expense_strategy(), 0..30),
    ) {
        let (mut block, _) = open_block(Money::from_cents(initial_cents));
        let mut expenses = Vec::new();
        for submission in submissions {
            let expense = Expense::record(&block, submission, block.responsible_id, Utc::now()).unwrap();
            block.record_expense(&expense, Utc::now()).unwrap();
            expenses.push(expense);
        }

        assert_block_reconciles(&block, &expenses);
        let summary = BlockSummary::from_expenses(&expenses);
        prop_assert!(domain_accounting::reconcile(&block, &summary).is_ok());
    }

    #[test]
    fn prop_next_code_follows_latest(latest in block_code_strategy()) {
        let next = BlockCode::next_after(Some(&latest)).unwrap();

        prop_assert_eq!(next.sequence(), latest.sequence() + 1);
        prop_assert_eq!(BlockCode::parse(&next.to_string()).ok(), Some(next));
    }

    #[test]
    fn prop_negative_without_reimbursement_never_ready(
        debits in prop::collection::vec(1i64..100_000, 1..10),
        credits in prop::collection::vec(1i64..100_000, 0..10),
    ) {
        let (mut block, _) = open_block(Money::zero());
        let mut expenses = Vec::new();
        for cents in &debits {
            add(&mut block, &mut expenses, ExpenseKind::Debit, Money::from_cents(*cents));
        }
        for cents in &credits {
            add(&mut block, &mut expenses, ExpenseKind::Credit, Money::from_cents(*cents));
        }

        let saldo = BlockSummary::from_expenses(&expenses).saldo;
        let decision = evaluate_close(&block, &expenses).unwrap();
        prop_assert_eq!(
            matches!(decision, CloseDecision::AwaitingReimbursement { .. }),
            saldo.is_negative()
        );
    }
}
