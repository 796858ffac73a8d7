//! Tests for the request aggregate and its state machine

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal_macros::dec;

use core_kernel::{BlockId, Company, Money, UserId};
use domain_request::{
    creation_notice, transition_notice, Actor, NewRequest, NotificationRecord, NotificationStatus,
    PayoutDetails, PixKeyType, Request, RequestError, RequestStatus, RequestType, Role, Transition,
};
use test_utils::{assert_funding_consistent, request_status_strategy, RequestBuilder};

fn create_request(amount: Money) -> Request {
    Request::new(
        NewRequest {
            amount,
            company: Company::new("Acme Ltda"),
            requester_id: UserId::new(),
            validator_id: UserId::new(),
            payout: PayoutDetails::pix("joao@example.com", PixKeyType::Email),
            description: Some("Viagem a Campinas".to_string()),
        },
        Money::new(dec!(50)),
        Utc::now(),
    )
    .unwrap()
}

fn finance() -> Actor {
    Actor::new(UserId::new(), Role::Finance)
}

/// Walks a request to AUTHORIZES through its named approvers
fn authorized_request() -> Request {
    let mut request = create_request(Money::new(dec!(200)));
    let validator = Actor::new(request.validator_id, Role::User);
    let authorizer = Actor::new(UserId::new(), Role::User);

    request
        .apply_transition(&validator, Transition::Validate { authorizer_id: authorizer.id }, Utc::now())
        .unwrap();
    request.apply_transition(&authorizer, Transition::Authorize, Utc::now()).unwrap();
    request
}

// ============================================================================
// Role Gating Tests
// ============================================================================

mod role_gating_tests {
    use super::*;

    #[test]
    fn test_stranger_cannot_validate() {
        let mut request = create_request(Money::new(dec!(100)));
        let stranger = Actor::new(UserId::new(), Role::User);

        let result = request.apply_transition(
            &stranger,
            Transition::Validate { authorizer_id: UserId::new() },
            Utc::now(),
        );

        assert!(matches!(result, Err(RequestError::Forbidden { .. })));
        assert_eq!(request.status, RequestStatus::Waiting);
    }

    #[test]
    fn test_validator_validates_exactly_once() {
        let mut request = create_request(Money::new(dec!(100)));
        let validator = Actor::new(request.validator_id, Role::User);

        request
            .apply_transition(&validator, Transition::Validate { authorizer_id: UserId::new() }, Utc::now())
            .unwrap();
        let again = request.apply_transition(
            &validator,
            Transition::Validate { authorizer_id: UserId::new() },
            Utc::now(),
        );

        assert_eq!(
            again,
            Err(RequestError::InvalidTransition {
                from: RequestStatus::Validates,
                to: RequestStatus::Validates,
            })
        );
    }

    #[test]
    fn test_only_assigned_authorizer_authorizes() {
        let mut request = create_request(Money::new(dec!(100)));
        let validator = Actor::new(request.validator_id, Role::User);
        let authorizer_id = UserId::new();
        request
            .apply_transition(&validator, Transition::Validate { authorizer_id }, Utc::now())
            .unwrap();

        // the validator is not the authorizer
        let by_validator = request.apply_transition(&validator, Transition::Authorize, Utc::now());
        assert!(matches!(by_validator, Err(RequestError::Forbidden { .. })));

        // finance does not stand in for the authorizer
        let by_finance = request.apply_transition(&finance(), Transition::Authorize, Utc::now());
        assert!(matches!(by_finance, Err(RequestError::Forbidden { .. })));

        let authorizer = Actor::new(authorizer_id, Role::User);
        assert!(request.apply_transition(&authorizer, Transition::Authorize, Utc::now()).is_ok());
    }

    #[test]
    fn test_plain_user_cannot_accept() {
        let mut request = authorized_request();
        let requester = Actor::new(request.requester_id, Role::User);

        let result = request.apply_transition(&requester, Transition::Accept, Utc::now());

        assert!(matches!(result, Err(RequestError::Forbidden { .. })));
    }

    #[test]
    fn test_finance_accepts_and_completes() {
        let mut request = authorized_request();
        let finance = finance();

        let accepted = request.apply_transition(&finance, Transition::Accept, Utc::now()).unwrap();
        assert!(accepted.draws_on_ledger());

        let completed = request
            .apply_transition(
                &finance,
                Transition::Complete { proof_of_payment: "comprovante-123.pdf".into() },
                Utc::now(),
            )
            .unwrap();
        assert!(completed.draws_on_ledger());
        assert_eq!(request.proof_of_payment.as_deref(), Some("comprovante-123.pdf"));
    }

    #[test]
    fn test_non_admin_cannot_skip_steps() {
        let mut request = create_request(Money::new(dec!(100)));

        let result = request.apply_transition(&finance(), Transition::Accept, Utc::now());

        assert_eq!(
            result,
            Err(RequestError::InvalidTransition {
                from: RequestStatus::Waiting,
                to: RequestStatus::Accepts,
            })
        );
    }
}

// ============================================================================
// Denial Tests
// ============================================================================

mod denial_tests {
    use super::*;

    #[test]
    fn test_validator_denies_waiting_request() {
        let mut request = create_request(Money::new(dec!(100)));
        let validator = Actor::new(request.validator_id, Role::User);

        request
            .apply_transition(&validator, Transition::Deny { reason: "Sem orçamento".into() }, Utc::now())
            .unwrap();

        assert_eq!(request.status, RequestStatus::Denied);
        assert_eq!(request.denial_reason.as_deref(), Some("Sem orçamento"));
    }

    #[test]
    fn test_finance_denies_authorized_request() {
        let mut request = authorized_request();

        let outcome = request
            .apply_transition(&finance(), Transition::Deny { reason: "Dados bancários inválidos".into() }, Utc::now())
            .unwrap();

        assert_eq!(outcome.from, RequestStatus::Authorizes);
        assert!(!outcome.draws_on_ledger());
    }

    #[test]
    fn test_denied_is_final_for_non_admins() {
        let mut request = create_request(Money::new(dec!(100)));
        let validator = Actor::new(request.validator_id, Role::User);
        request
            .apply_transition(&validator, Transition::Deny { reason: "Duplicada".into() }, Utc::now())
            .unwrap();

        let result = request.apply_transition(
            &validator,
            Transition::Validate { authorizer_id: UserId::new() },
            Utc::now(),
        );

        assert!(matches!(result, Err(RequestError::InvalidTransition { .. })));
    }

    #[test]
    fn test_admin_reopens_denied_request() {
        let mut request = create_request(Money::new(dec!(100)));
        let admin = Actor::new(UserId::new(), Role::Admin);
        request
            .apply_transition(&admin, Transition::Deny { reason: "Engano".into() }, Utc::now())
            .unwrap();

        let outcome = request
            .apply_transition(&admin, Transition::Validate { authorizer_id: UserId::new() }, Utc::now())
            .unwrap();

        assert_eq!(outcome.from, RequestStatus::Denied);
        assert_eq!(request.status, RequestStatus::Validates);
    }
}

// ============================================================================
// Terminal State Tests
// ============================================================================

mod terminal_tests {
    use super::*;

    fn completed_request() -> Request {
        let mut request = create_request(Money::new(dec!(100)));
        let admin = Actor::new(UserId::new(), Role::Admin);
        request
            .apply_transition(&admin, Transition::Complete { proof_of_payment: "pix-e2e-1".into() }, Utc::now())
            .unwrap();
        request
    }

    #[test]
    fn test_completed_rejects_every_transition() {
        let admin = Actor::new(UserId::new(), Role::Admin);
        let transitions = vec![
            Transition::Validate { authorizer_id: UserId::new() },
            Transition::Authorize,
            Transition::Accept,
            Transition::Complete { proof_of_payment: "x".into() },
            Transition::Deny { reason: "late".into() },
        ];

        for transition in transitions {
            let mut request = completed_request();
            let result = request.apply_transition(&admin, transition, Utc::now());
            assert_eq!(
                result,
                Err(RequestError::TerminalState { status: RequestStatus::Completed })
            );
        }
    }

    #[test]
    fn test_completion_requires_proof() {
        let mut request = authorized_request();
        let finance = finance();
        request.apply_transition(&finance, Transition::Accept, Utc::now()).unwrap();

        let result = request.apply_transition(
            &finance,
            Transition::Complete { proof_of_payment: String::new() },
            Utc::now(),
        );

        assert!(matches!(result, Err(RequestError::Validation(_))));
        assert_eq!(request.status, RequestStatus::Accepts);
    }

    #[test]
    fn test_notification_can_be_recorded_after_completion() {
        let mut request = completed_request();

        request.record_notification(NotificationRecord::failed("gateway down"));

        let record = request.notification.unwrap();
        assert_eq!(record.status, NotificationStatus::Error);
        assert_eq!(record.error.as_deref(), Some("gateway down"));
    }
}

// ============================================================================
// Funding Tests
// ============================================================================

mod funding_tests {
    use super::*;

    #[test]
    fn test_shortfall_leaves_unfunded_remainder() {
        let mut request = create_request(Money::new(dec!(200)));

        request.apply_funding(Money::new(dec!(50)), Utc::now()).unwrap();

        assert_eq!(request.balance_deducted, Money::new(dec!(50)));
        assert_eq!(request.current_balance, Money::new(dec!(150)));
    }

    #[test]
    fn test_funding_accumulates_across_draws() {
        let mut request = create_request(Money::new(dec!(200)));

        request.apply_funding(Money::new(dec!(30)), Utc::now()).unwrap();
        request.apply_funding(Money::new(dec!(20)), Utc::now()).unwrap();

        assert_eq!(request.balance_deducted, Money::new(dec!(50)));
        assert_eq!(request.current_balance, Money::new(dec!(150)));
        assert_eq!(request.balance_deducted + request.current_balance, request.amount);
    }

    #[test]
    fn test_allowance_is_bounded_by_creation_snapshot() {
        let mut request = create_request(Money::new(dec!(200)));
        assert_eq!(request.funding_allowance(), Money::new(dec!(50)));

        request.apply_funding(Money::new(dec!(40)), Utc::now()).unwrap();

        assert_eq!(request.funding_allowance(), Money::new(dec!(10)));
        let result = request.apply_funding(Money::new(dec!(20)), Utc::now());
        assert!(matches!(result, Err(RequestError::FundingExceedsSnapshot { .. })));
        assert_eq!(request.balance_deducted, Money::new(dec!(40)));
    }

    #[test]
    fn test_negative_snapshot_allows_no_draw() {
        let mut request = Request::new(
            NewRequest {
                amount: Money::new(dec!(80)),
                company: Company::new("Acme Ltda"),
                requester_id: UserId::new(),
                validator_id: UserId::new(),
                payout: PayoutDetails::pix("joao@example.com", PixKeyType::Email),
                description: None,
            },
            Money::new(dec!(-30)),
            Utc::now(),
        )
        .unwrap();

        assert!(request.funding_allowance().is_zero());
        request.apply_funding(Money::zero(), Utc::now()).unwrap();
        assert!(request.apply_funding(Money::new(dec!(1)), Utc::now()).is_err());
    }
}

// ============================================================================
// Reimbursement and Notice Tests
// ============================================================================

mod reimbursement_tests {
    use super::*;

    #[test]
    fn test_reimbursement_copies_origin_and_starts_authorized() {
        let origin = authorized_request();
        let block_id = BlockId::new();

        let reimbursement = Request::reimbursement_of(
            &origin,
            block_id,
            Money::new(dec!(100)),
            Money::new(dec!(-100)),
            "Reembolso do bloco 03-PRC",
            Utc::now(),
        )
        .unwrap();

        assert_eq!(reimbursement.request_type, RequestType::Reimbursement);
        assert_eq!(reimbursement.status, RequestStatus::Authorizes);
        assert_eq!(reimbursement.payout, origin.payout);
        assert_eq!(reimbursement.requester_id, origin.requester_id);
        assert_eq!(reimbursement.authorizer_id, origin.authorizer_id);
        assert_eq!(reimbursement.origin_block, Some(block_id));
        assert_ne!(reimbursement.id, origin.id);
    }

    #[test]
    fn test_creation_notice_goes_to_validator() {
        let request = create_request(Money::new(dec!(75)));

        let notice = creation_notice(&request);

        assert_eq!(notice.recipient, request.validator_id);
        assert!(notice.message.contains("R$ 75.00"));
    }

    #[test]
    fn test_validation_notice_goes_to_authorizer() {
        let mut request = create_request(Money::new(dec!(75)));
        let validator = Actor::new(request.validator_id, Role::User);
        let authorizer_id = UserId::new();
        let outcome = request
            .apply_transition(&validator, Transition::Validate { authorizer_id }, Utc::now())
            .unwrap();

        let notice = transition_notice(&request, &outcome).unwrap();

        assert_eq!(notice.recipient, authorizer_id);
    }

    #[test]
    fn test_denial_notice_carries_reason() {
        let mut request = create_request(Money::new(dec!(75)));
        let validator = Actor::new(request.validator_id, Role::User);
        let outcome = request
            .apply_transition(&validator, Transition::Deny { reason: "Fora da política".into() }, Utc::now())
            .unwrap();

        let notice = transition_notice(&request, &outcome).unwrap();

        assert_eq!(notice.recipient, request.requester_id);
        assert!(notice.message.contains("Fora da política"));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

fn transition_strategy() -> impl Strategy<Value = Transition> {
    prop_oneof![
        Just(Transition::Validate { authorizer_id: UserId::new() }),
        Just(Transition::Authorize),
        Just(Transition::Accept),
        Just(Transition::Complete { proof_of_payment: "proof".to_string() }),
        Just(Transition::Deny { reason: "reason".to_string() }),
    ]
}

fn role_strategy() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::Admin), Just(Role::Finance), Just(Role::User)]
}

proptest! {
    #[test]
    fn prop_completed_never_changes(
        steps in prop::collection::vec((role_strategy(), transition_strategy()), 1..20)
    ) {
        let mut request = create_request(Money::new(dec!(500)));
        let mut completed: Option<Request> = None;

        for (role, transition) in steps {
            let actor = Actor::new(UserId::new(), role);
            let _ = request.apply_transition(&actor, transition, Utc::now());

            if let Some(snapshot) = &completed {
                prop_assert_eq!(&request, snapshot);
            } else if request.status == RequestStatus::Completed {
                completed = Some(request.clone());
            }
        }
        assert_funding_consistent(&request);
    }

    #[test]
    fn prop_failed_transitions_leave_request_untouched(
        status in request_status_strategy(),
        role in role_strategy(),
        transition in transition_strategy(),
    ) {
        let mut request = RequestBuilder::new().in_status(status).build().unwrap();
        let before = request.clone();
        let actor = Actor::new(UserId::new(), role);

        if request.apply_transition(&actor, transition, Utc::now()).is_err() {
            prop_assert_eq!(request, before);
        }
    }
}
