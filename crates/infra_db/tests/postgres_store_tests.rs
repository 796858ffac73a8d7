//! Lifecycle services against a real PostgreSQL
//!
//! These tests start a container and are ignored by default:
//!
//! ```text
//! cargo test -p infra_db -- --ignored
//! ```

use std::sync::Arc;

use rust_decimal_macros::dec;

use core_kernel::{HealthCheckable, Money};
use domain_accounting::BlockStatus;
use domain_balance::BalanceKey;
use domain_lifecycle::adapters::{InMemoryDocumentStorage, PlainTextStatementGenerator, TracingNotifier};
use domain_lifecycle::{
    CloseOutcome, CreateRequest, IdentityResolver, LifecycleError, LifecycleStore, RequestFilter, ServiceContext,
    Services,
};
use domain_request::{RequestStatus, Role, Transition};
use infra_db::{PgDirectory, PgLifecycleStore};
use test_utils::{
    assert_block_closed, assert_funding_consistent, create_isolated_test_database, ActorFixtures, ExpenseBuilder,
    PayoutFixtures, StringFixtures, TestDatabase,
};

struct PgHarness {
    db: TestDatabase,
    store: PgLifecycleStore,
    services: Services,
}

impl PgHarness {
    async fn start() -> Self {
        let db = create_isolated_test_database().await.expect("container starts");
        for actor in ActorFixtures::all() {
            db.insert_profile(&actor).await.expect("profile inserted");
        }

        let store = PgLifecycleStore::new(db.pool().clone());
        let context = ServiceContext::new(
            Arc::new(store.clone()),
            Arc::new(TracingNotifier),
            Arc::new(PlainTextStatementGenerator),
            Arc::new(InMemoryDocumentStorage::default()),
            Arc::new(PgDirectory::new(db.pool().clone())),
        );

        Self {
            db,
            store,
            services: Services::new(context),
        }
    }

    async fn accepted(&self, amount: Money) -> domain_lifecycle::TransitionResult {
        let requests = &self.services.requests;
        let request = requests
            .create_request(
                &ActorFixtures::requester(),
                CreateRequest {
                    amount,
                    company: StringFixtures::company(),
                    validator_id: ActorFixtures::validator().id,
                    payout: PayoutFixtures::pix_email(),
                    description: None,
                },
            )
            .await
            .unwrap();
        requests
            .transition(
                request.id,
                &ActorFixtures::validator(),
                Transition::Validate {
                    authorizer_id: ActorFixtures::authorizer().id,
                },
            )
            .await
            .unwrap();
        requests
            .transition(request.id, &ActorFixtures::authorizer(), Transition::Authorize)
            .await
            .unwrap();
        requests
            .transition(request.id, &ActorFixtures::finance(), Transition::Accept)
            .await
            .unwrap()
    }
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_health_check_reports_healthy() {
    let h = PgHarness::start().await;

    assert!(h.store.health_check().await.is_healthy());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_directory_reads_role_from_metadata() {
    let h = PgHarness::start().await;
    let directory = PgDirectory::new(h.db.pool().clone());

    let finance = directory.resolve(ActorFixtures::finance().id).await.unwrap();
    let unknown = directory.resolve(core_kernel::UserId::new()).await;

    assert_eq!(finance.role, Role::Finance);
    assert_eq!(finance.display_name, "Financeiro");
    assert!(unknown.unwrap_err().is_not_found());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_accept_opens_sequential_blocks() {
    let h = PgHarness::start().await;

    let first = h.accepted(Money::new(dec!(100))).await;
    let second = h.accepted(Money::new(dec!(40))).await;

    assert_eq!(first.block.unwrap().code.to_string(), "01-PRC");
    assert_eq!(second.block.unwrap().code.to_string(), "02-PRC");
    assert_funding_consistent(&second.request);

    let accepted = h
        .store
        .list_requests(&RequestFilter::by_status(RequestStatus::Accepts))
        .await
        .unwrap();
    assert_eq!(accepted.len(), 2);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_expenses_move_ledger_and_close_deletes_request() {
    let h = PgHarness::start().await;
    let requester = ActorFixtures::requester();
    let accepted = h.accepted(Money::new(dec!(100))).await;
    let block = accepted.block.unwrap();

    let spent = h
        .services
        .expenses
        .register_expense(block.id, &requester, ExpenseBuilder::debit(Money::new(dec!(30))).build())
        .await
        .unwrap();
    let ledger = h
        .store
        .get_balance(&BalanceKey::new(requester.id, StringFixtures::company()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ledger.balance, Money::new(dec!(-30)));
    let stored: Vec<_> = h.store.list_expenses(block.id).await.unwrap().into_iter().map(|e| e.id).collect();
    assert_eq!(stored, vec![spent.id]);

    h.services
        .expenses
        .register_expense(block.id, &requester, ExpenseBuilder::reimbursement(Money::new(dec!(10))).build())
        .await
        .unwrap();

    let outcome = h.services.blocks.close_block(block.id, &requester).await.unwrap();

    match outcome {
        CloseOutcome::Closed {
            block: closed,
            saldo_final,
            deleted_request,
            ..
        } => {
            assert_block_closed(&closed);
            assert_eq!(saldo_final, Money::new(dec!(80)));
            assert_eq!(deleted_request, Some(accepted.request.id));
        }
        other => panic!("expected a closed block, got {:?}", other),
    }
    assert!(h.store.get_request(accepted.request.id).await.unwrap().is_none());
    let stored = h.store.get_block(block.id).await.unwrap().unwrap();
    assert_eq!(stored.status, BlockStatus::Closed);
    assert!(stored.request_id.is_none());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_expense_on_closed_block_is_rejected() {
    let h = PgHarness::start().await;
    let requester = ActorFixtures::requester();
    let block = h.accepted(Money::new(dec!(20))).await.block.unwrap();
    h.services.blocks.close_block(block.id, &requester).await.unwrap();

    let result = h
        .services
        .expenses
        .register_expense(block.id, &requester, ExpenseBuilder::new().build())
        .await;

    assert!(matches!(result, Err(LifecycleError::TerminalStateViolation(_))));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_accept_draws_positive_ledger_first() {
    let h = PgHarness::start().await;
    let requester = ActorFixtures::requester();
    let key = BalanceKey::new(requester.id, StringFixtures::company());
    let mut seeded = domain_balance::UserBalance::zero(key.clone(), chrono::Utc::now());
    seeded.balance = Money::new(dec!(25));
    h.db.seed_balance(&seeded).await.unwrap();

    let accepted = h.accepted(Money::new(dec!(100))).await;

    assert_eq!(accepted.deducted, Money::new(dec!(25)));
    assert_eq!(accepted.request.current_balance, Money::new(dec!(75)));
    assert_funding_consistent(&accepted.request);
    let ledger = h.store.get_balance(&key).await.unwrap().unwrap();
    assert!(ledger.balance.is_zero());
    assert_eq!(accepted.block.unwrap().initial_amount, Money::new(dec!(100)));
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_concurrent_completion_and_expense_both_commit() {
    let h = PgHarness::start().await;
    let requester = ActorFixtures::requester();
    let accepted = h.accepted(Money::new(dec!(100))).await;
    let block = accepted.block.unwrap();

    let finance = ActorFixtures::finance();
    let complete = h.services.requests.transition(
        accepted.request.id,
        &finance,
        Transition::Complete {
            proof_of_payment: "comprovante-789.pdf".to_string(),
        },
    );
    let spend = h
        .services
        .expenses
        .register_expense(block.id, &requester, ExpenseBuilder::debit(Money::new(dec!(30))).build());
    let (completed, spent) = tokio::join!(complete, spend);

    assert_eq!(completed.unwrap().request.status, RequestStatus::Completed);
    assert!(spent.is_ok());
    let ledger = h
        .store
        .get_balance(&BalanceKey::new(requester.id, StringFixtures::company()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ledger.balance, Money::new(dec!(-30)));
}
