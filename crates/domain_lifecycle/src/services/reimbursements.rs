//! Reimbursement initiation
//!
//! Raised explicitly by the user once a close was refused for a negative
//! balance. The new request re-enters the pipeline at AUTHORIZES and the
//! originating block moves to APPROVED. The originating request is locked
//! before its block and ledger.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use core_kernel::{with_retry, BlockId, RequestId};
use domain_accounting::{AccountingBlock, BlockSummary, ReimbursementPlan};
use domain_balance::BalanceKey;
use domain_request::{transition_notice, Actor, Request, TransitionOutcome};

use crate::error::LifecycleError;
use crate::events::LifecycleEvent;
use crate::ports::UnitOfWork;
use crate::services::ServiceContext;
use crate::transaction::{settle, within_timeout};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReimbursementResult {
    pub request: Request,
    pub block: AccountingBlock,
}

#[derive(Clone)]
pub struct ReimbursementService {
    ctx: Arc<ServiceContext>,
}

impl ReimbursementService {
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// Creates the REIMBURSEMENT request for a negative block
    ///
    /// The block's requester, FINANCE and ADMIN may initiate.
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn initiate_reimbursement(
        &self,
        block_id: BlockId,
        actor: &Actor,
    ) -> Result<ReimbursementResult, LifecycleError> {
        let config = &self.ctx.config;
        let mut result = with_retry(&config.retry, "initiate_reimbursement", LifecycleError::retry_class, || {
            within_timeout(
                config.transaction_timeout,
                "initiate_reimbursement",
                self.initiate_attempt(block_id, actor),
            )
        })
        .await?;

        self.ctx
            .events
            .publish(&[
                LifecycleEvent::RequestChanged {
                    request_id: result.request.id,
                    status: Some(result.request.status),
                },
                LifecycleEvent::BlockChanged {
                    block_id: result.block.id,
                    status: result.block.status,
                },
            ])
            .await;

        let entry = TransitionOutcome {
            from: result.request.status,
            to: result.request.status,
        };
        if let Some(notice) = transition_notice(&result.request, &entry) {
            self.ctx.notify_committed(&mut result.request, notice).await;
        }

        info!(
            block = %result.block.code,
            request_id = %result.request.id,
            amount = %result.request.amount,
            "Reimbursement initiated"
        );
        Ok(result)
    }

    async fn initiate_attempt(&self, block_id: BlockId, actor: &Actor) -> Result<ReimbursementResult, LifecycleError> {
        let origin = self.ctx.store.get_block(block_id).await?.and_then(|block| block.request_id);
        let now = self.ctx.clock.now();
        let mut uow = self.ctx.store.begin().await?;
        let result = initiate_in(uow.as_mut(), block_id, origin, actor, now).await;
        settle(uow, result).await
    }
}

async fn initiate_in(
    uow: &mut dyn UnitOfWork,
    block_id: BlockId,
    origin_id: Option<RequestId>,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<ReimbursementResult, LifecycleError> {
    let origin = match origin_id {
        Some(request_id) => uow.lock_request(request_id).await?,
        None => None,
    };

    let mut block = uow
        .lock_block(block_id)
        .await?
        .ok_or_else(|| LifecycleError::not_found("AccountingBlock", block_id))?;
    if actor.id != block.responsible_id && !actor.role.can_disburse() {
        return Err(LifecycleError::forbidden(format!(
            "user {} may not request a reimbursement for block {}",
            actor.id, block.code
        )));
    }
    block.ensure_not_closed()?;

    let owner_id = block
        .request_id
        .ok_or_else(|| LifecycleError::not_found("Request for block", &block.code))?;
    let origin = match origin {
        Some(origin) if origin.id == owner_id => origin,
        Some(_) => {
            return Err(LifecycleError::conflict(format!(
                "Block {} changed owner while the reimbursement was being raised",
                block.code
            )))
        }
        None => return Err(LifecycleError::not_found("Request", owner_id)),
    };

    let expenses = uow.block_expenses(block.id).await?;
    let plan = ReimbursementPlan::for_block(&block, &BlockSummary::from_expenses(&expenses))?;

    let key = BalanceKey::new(origin.requester_id, origin.company.clone());
    let ledger = uow.lock_balance(&key, now).await?;
    let request = plan.into_request(&origin, ledger.balance, now)?;

    block.mark_reimbursement_requested(now)?;

    uow.insert_request(&request).await?;
    uow.update_block(&block).await?;

    Ok(ReimbursementResult { request, block })
}
