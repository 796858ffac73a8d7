//! Block queries and the close procedure
//!
//! Closing runs in two phases. The statement is rendered and uploaded from a
//! plain read; the unit of work then re-locks the block, checks that nothing
//! moved in between, and applies the close. The owning request is locked
//! before the block, matching the order transitions and expenses use.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use core_kernel::{with_retry, BlockId, Money, RequestId};
use domain_accounting::{
    evaluate_close, AccountingBlock, BlockSummary, CloseDecision, ClosingStatement,
};
use domain_request::Actor;

use crate::error::LifecycleError;
use crate::events::LifecycleEvent;
use crate::ports::{BlockFilter, UnitOfWork};
use crate::services::ServiceContext;
use crate::transaction::{settle, within_timeout};

/// Outcome of a close attempt
///
/// A negative block without a reimbursement is an expected state the user
/// can act on, so it is reported here rather than as an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CloseOutcome {
    Closed {
        block: AccountingBlock,
        saldo_final: Money,
        pdf_url: String,
        /// The owning request, deleted with the close
        deleted_request: Option<RequestId>,
    },
    AwaitingReimbursement {
        block_id: BlockId,
        saldo: Money,
        message: String,
    },
}

/// A block with the totals of its current expenses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDetails {
    pub block: AccountingBlock,
    pub summary: BlockSummary,
}

#[derive(Clone)]
pub struct BlockService {
    ctx: Arc<ServiceContext>,
}

impl BlockService {
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    pub async fn get_block(&self, block_id: BlockId) -> Result<BlockDetails, LifecycleError> {
        let block = self
            .ctx
            .store
            .get_block(block_id)
            .await?
            .ok_or_else(|| LifecycleError::not_found("AccountingBlock", block_id))?;
        let expenses = self.ctx.store.list_expenses(block_id).await?;
        Ok(BlockDetails {
            block,
            summary: BlockSummary::from_expenses(&expenses),
        })
    }

    pub async fn list_blocks(&self, filter: &BlockFilter) -> Result<Vec<AccountingBlock>, LifecycleError> {
        Ok(self.ctx.store.list_blocks(filter).await?)
    }

    /// Closes a block, or reports that it awaits a reimbursement
    ///
    /// The block's requester, FINANCE and ADMIN may close.
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn close_block(&self, block_id: BlockId, actor: &Actor) -> Result<CloseOutcome, LifecycleError> {
        let config = &self.ctx.config;
        let outcome = with_retry(&config.retry, "close_block", LifecycleError::retry_class, || {
            within_timeout(config.close_timeout, "close_block", self.close_attempt(block_id, actor))
        })
        .await?;

        match &outcome {
            CloseOutcome::Closed {
                block,
                saldo_final,
                pdf_url,
                deleted_request,
            } => {
                let mut events = vec![LifecycleEvent::BlockChanged {
                    block_id: block.id,
                    status: block.status,
                }];
                if let Some(request_id) = deleted_request {
                    events.push(LifecycleEvent::RequestChanged {
                        request_id: *request_id,
                        status: None,
                    });
                }
                self.ctx.events.publish(&events).await;
                info!(block = %block.code, %saldo_final, %pdf_url, "Block closed");
            }
            CloseOutcome::AwaitingReimbursement { saldo, .. } => {
                info!(%block_id, %saldo, "Block close refused: awaiting reimbursement");
            }
        }
        Ok(outcome)
    }

    async fn close_attempt(&self, block_id: BlockId, actor: &Actor) -> Result<CloseOutcome, LifecycleError> {
        let store = &self.ctx.store;
        let block = store
            .get_block(block_id)
            .await?
            .ok_or_else(|| LifecycleError::not_found("AccountingBlock", block_id))?;
        block.ensure_not_closed()?;
        if actor.id != block.responsible_id && !actor.role.can_disburse() {
            return Err(LifecycleError::forbidden(format!(
                "user {} may not close block {}",
                actor.id, block.code
            )));
        }

        let expenses = store.list_expenses(block_id).await?;
        let summary = match evaluate_close(&block, &expenses)? {
            CloseDecision::AwaitingReimbursement { saldo, message } => {
                return Ok(CloseOutcome::AwaitingReimbursement {
                    block_id,
                    saldo,
                    message,
                })
            }
            CloseDecision::Ready { summary } => summary,
        };

        let request = match block.request_id {
            Some(request_id) => store.get_request(request_id).await?,
            None => None,
        };
        let responsible_name = self.responsible_name(&block).await;
        let statement = ClosingStatement::new(block.clone(), expenses, request);

        let document = self
            .ctx
            .documents
            .generate(&statement, block.company.as_str(), &responsible_name)
            .await
            .map_err(LifecycleError::document)?;
        let pdf_url = self
            .ctx
            .storage
            .upload(document.bytes, &statement.filename(), &document.content_type)
            .await
            .map_err(LifecycleError::document)?;

        let now = self.ctx.clock.now();
        let mut uow = store.begin().await?;
        let result = close_in(uow.as_mut(), &block, &summary, pdf_url, now).await;
        settle(uow, result).await
    }

    async fn responsible_name(&self, block: &AccountingBlock) -> String {
        match self.ctx.identity.resolve(block.responsible_id).await {
            Ok(actor) => actor.display_name,
            Err(error) => {
                warn!(user_id = %block.responsible_id, error = %error, "Could not resolve block responsible");
                block.responsible_id.to_string()
            }
        }
    }
}

async fn close_in(
    uow: &mut dyn UnitOfWork,
    snapshot: &AccountingBlock,
    summary: &BlockSummary,
    pdf_url: String,
    now: DateTime<Utc>,
) -> Result<CloseOutcome, LifecycleError> {
    if let Some(request_id) = snapshot.request_id {
        uow.lock_request(request_id).await?;
    }
    let mut block = uow
        .lock_block(snapshot.id)
        .await?
        .ok_or_else(|| LifecycleError::not_found("AccountingBlock", snapshot.id))?;
    block.ensure_not_closed()?;

    let expenses = uow.block_expenses(block.id).await?;
    if block.status != snapshot.status
        || block.request_id != snapshot.request_id
        || block.current_balance != snapshot.current_balance
        || BlockSummary::from_expenses(&expenses) != *summary
    {
        return Err(LifecycleError::conflict(format!(
            "block {} changed while its closing statement was generated",
            block.code
        )));
    }

    let request_id = block.request_id;
    let saldo_final = block.close(pdf_url.clone(), now)?;
    uow.update_block(&block).await?;
    uow.delete_block_expenses(block.id).await?;
    if let Some(request_id) = request_id {
        uow.delete_request(request_id).await?;
    }

    Ok(CloseOutcome::Closed {
        block,
        saldo_final,
        pdf_url,
        deleted_request: request_id,
    })
}
