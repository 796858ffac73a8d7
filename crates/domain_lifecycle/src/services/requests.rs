//! Request operations
//!
//! Entering ACCEPTS or COMPLETED draws on the requester's ledger and, for a
//! deposit without a block, opens the accounting block in the same unit of
//! work. Rows are locked request, then block, then ledger.
//!
//! Notifications go out once per operation, after the commit.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use core_kernel::{with_retry, Company, Money, RequestId, UserId};
use domain_accounting::{AccountingBlock, BlockCode};
use domain_balance::BalanceKey;
use domain_request::{
    creation_notice, transition_notice, Actor, NewRequest, PayoutDetails, Request, RequestType,
    Transition, TransitionOutcome,
};

use crate::error::LifecycleError;
use crate::events::LifecycleEvent;
use crate::ports::{RequestFilter, UnitOfWork};
use crate::services::ServiceContext;
use crate::transaction::{settle, within_timeout};

/// Input for a new deposit request; the requester is the acting user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRequest {
    pub amount: Money,
    pub company: Company,
    pub validator_id: UserId,
    pub payout: PayoutDetails,
    pub description: Option<String>,
}

/// Result of a committed transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionResult {
    pub request: Request,
    pub outcome: TransitionOutcome,
    /// Amount drawn from the ledger by this transition
    pub deducted: Money,
    /// Block opened by this transition, if any
    pub block: Option<AccountingBlock>,
}

#[derive(Clone)]
pub struct RequestService {
    ctx: Arc<ServiceContext>,
}

impl RequestService {
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// Creates a WAITING deposit request for `actor`
    #[instrument(skip(self, actor, input), fields(actor = %actor.id, company = %input.company))]
    pub async fn create_request(&self, actor: &Actor, input: CreateRequest) -> Result<Request, LifecycleError> {
        let config = &self.ctx.config;
        let mut request = with_retry(&config.retry, "create_request", LifecycleError::retry_class, || {
            within_timeout(
                config.transaction_timeout,
                "create_request",
                self.create_attempt(actor, input.clone()),
            )
        })
        .await?;

        self.ctx
            .events
            .publish(&[LifecycleEvent::RequestChanged {
                request_id: request.id,
                status: Some(request.status),
            }])
            .await;
        let notice = creation_notice(&request);
        self.ctx.notify_committed(&mut request, notice).await;

        info!(request_id = %request.id, amount = %request.amount, "Request created");
        Ok(request)
    }

    async fn create_attempt(&self, actor: &Actor, input: CreateRequest) -> Result<Request, LifecycleError> {
        let now = self.ctx.clock.now();
        let mut uow = self.ctx.store.begin().await?;
        let result = self.create_in(uow.as_mut(), actor, input, now).await;
        settle(uow, result).await
    }

    async fn create_in(
        &self,
        uow: &mut dyn UnitOfWork,
        actor: &Actor,
        input: CreateRequest,
        now: DateTime<Utc>,
    ) -> Result<Request, LifecycleError> {
        let key = BalanceKey::new(actor.id, input.company.clone());
        let ledger = uow.lock_balance(&key, now).await?;

        let request = Request::new(
            NewRequest {
                amount: input.amount,
                company: input.company,
                requester_id: actor.id,
                validator_id: input.validator_id,
                payout: input.payout,
                description: input.description,
            },
            ledger.balance,
            now,
        )?;

        uow.insert_request(&request).await?;
        Ok(request)
    }

    /// Moves a request through the approval pipeline
    #[instrument(skip(self, actor, transition), fields(actor = %actor.id, action = transition.name()))]
    pub async fn transition(
        &self,
        request_id: RequestId,
        actor: &Actor,
        transition: Transition,
    ) -> Result<TransitionResult, LifecycleError> {
        let config = &self.ctx.config;
        let mut result = with_retry(&config.retry, "transition_request", LifecycleError::retry_class, || {
            within_timeout(
                config.transaction_timeout,
                "transition_request",
                self.transition_attempt(request_id, actor, transition.clone()),
            )
        })
        .await?;

        let mut events = vec![LifecycleEvent::RequestChanged {
            request_id,
            status: Some(result.request.status),
        }];
        if result.outcome.draws_on_ledger() {
            events.push(LifecycleEvent::BalanceChanged {
                key: BalanceKey::new(result.request.requester_id, result.request.company.clone()),
            });
        }
        if let Some(block) = &result.block {
            events.push(LifecycleEvent::BlockChanged {
                block_id: block.id,
                status: block.status,
            });
        }
        self.ctx.events.publish(&events).await;
        if let Some(notice) = transition_notice(&result.request, &result.outcome) {
            self.ctx.notify_committed(&mut result.request, notice).await;
        }

        info!(
            %request_id,
            from = %result.outcome.from,
            to = %result.outcome.to,
            deducted = %result.deducted,
            block = result.block.as_ref().map(|b| b.code.to_string()),
            "Request transition committed"
        );
        Ok(result)
    }

    async fn transition_attempt(
        &self,
        request_id: RequestId,
        actor: &Actor,
        transition: Transition,
    ) -> Result<TransitionResult, LifecycleError> {
        let now = self.ctx.clock.now();
        let mut uow = self.ctx.store.begin().await?;
        let result = self.transition_in(uow.as_mut(), request_id, actor, transition, now).await;
        settle(uow, result).await
    }

    async fn transition_in(
        &self,
        uow: &mut dyn UnitOfWork,
        request_id: RequestId,
        actor: &Actor,
        transition: Transition,
        now: DateTime<Utc>,
    ) -> Result<TransitionResult, LifecycleError> {
        let mut request = uow
            .lock_request(request_id)
            .await?
            .ok_or_else(|| LifecycleError::not_found("Request", request_id))?;

        let outcome = request.apply_transition(actor, transition, now)?;

        let (deducted, block) = if outcome.draws_on_ledger() {
            self.fund(uow, &mut request, now).await?
        } else {
            (Money::zero(), None)
        };

        uow.update_request(&request).await?;

        Ok(TransitionResult {
            request,
            outcome,
            deducted,
            block,
        })
    }

    /// Draws what the ledger can cover and opens the block if needed
    ///
    /// The request row is already locked; the existing block is locked next
    /// and the ledger last.
    async fn fund(
        &self,
        uow: &mut dyn UnitOfWork,
        request: &mut Request,
        now: DateTime<Utc>,
    ) -> Result<(Money, Option<AccountingBlock>), LifecycleError> {
        let needs_block =
            request.request_type == RequestType::Deposit && uow.block_for_request(request.id).await?.is_none();

        let key = BalanceKey::new(request.requester_id, request.company.clone());
        let mut ledger = uow.lock_balance(&key, now).await?;

        let before_deduction = request.current_balance;
        let deducted = ledger.fundable(request.funding_allowance());
        if deducted.is_positive() {
            ledger.debit(deducted, now)?;
            uow.save_balance(&ledger).await?;
        }
        request.apply_funding(deducted, now)?;

        if !needs_block {
            return Ok((deducted, None));
        }

        let latest = uow
            .latest_block_code()
            .await?
            .map(|code| BlockCode::parse(&code))
            .transpose()?;
        let code = BlockCode::next_after(latest.as_ref())?;
        let block = AccountingBlock::open_for(request, code, before_deduction, now);
        uow.insert_block(&block).await?;

        Ok((deducted, Some(block)))
    }

    pub async fn get_request(&self, request_id: RequestId) -> Result<Request, LifecycleError> {
        self.ctx
            .store
            .get_request(request_id)
            .await?
            .ok_or_else(|| LifecycleError::not_found("Request", request_id))
    }

    pub async fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<Request>, LifecycleError> {
        Ok(self.ctx.store.list_requests(filter).await?)
    }
}
