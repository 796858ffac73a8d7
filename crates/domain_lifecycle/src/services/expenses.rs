//! Expense operations
//!
//! The ledger of the block's requester moves by the expense amount whatever
//! its kind; the kind only decides the sign of its effect on the block's
//! running balance.
//!
//! Rows are locked request, then block, then expense, then ledger, the same
//! order transitions use. The owning request is looked up before the unit of
//! work begins and re-checked once the block is locked.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use core_kernel::{with_retry, BlockId, ExpenseId, RequestId};
use domain_accounting::{AccountingBlock, Expense, ExpenseUpdate, NewExpense};
use domain_balance::{BalanceKey, LedgerMovement};
use domain_request::{Actor, Request};

use crate::error::LifecycleError;
use crate::events::LifecycleEvent;
use crate::ports::UnitOfWork;
use crate::services::ServiceContext;
use crate::transaction::{settle, within_timeout};

/// What an expense mutation touched, for event publication
struct Touched<T> {
    value: T,
    block: AccountingBlock,
    key: BalanceKey,
}

#[derive(Clone)]
pub struct ExpenseService {
    ctx: Arc<ServiceContext>,
}

impl ExpenseService {
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    async fn publish<T>(&self, touched: &Touched<T>) {
        self.ctx
            .events
            .publish(&[
                LifecycleEvent::BalanceChanged {
                    key: touched.key.clone(),
                },
                LifecycleEvent::BlockChanged {
                    block_id: touched.block.id,
                    status: touched.block.status,
                },
            ])
            .await;
    }

    /// Records an expense against an open block
    #[instrument(skip(self, actor, expense), fields(actor = %actor.id, amount = %expense.amount, kind = %expense.kind))]
    pub async fn register_expense(
        &self,
        block_id: BlockId,
        actor: &Actor,
        expense: NewExpense,
    ) -> Result<Expense, LifecycleError> {
        let config = &self.ctx.config;
        let touched = with_retry(&config.retry, "register_expense", LifecycleError::retry_class, || {
            within_timeout(
                config.transaction_timeout,
                "register_expense",
                self.register_attempt(block_id, actor, expense.clone()),
            )
        })
        .await?;

        self.publish(&touched).await;
        info!(
            expense_id = %touched.value.id,
            block = %touched.block.code,
            block_balance = %touched.block.current_balance,
            "Expense registered"
        );
        Ok(touched.value)
    }

    async fn register_attempt(
        &self,
        block_id: BlockId,
        actor: &Actor,
        expense: NewExpense,
    ) -> Result<Touched<Expense>, LifecycleError> {
        let owner = self.block_owner(block_id).await?;
        let now = self.ctx.clock.now();
        let mut uow = self.ctx.store.begin().await?;
        let result = register_in(uow.as_mut(), block_id, owner, actor, expense, now).await;
        settle(uow, result).await
    }

    /// Edits an expense; only its creator may do so
    #[instrument(skip(self, actor, update), fields(actor = %actor.id))]
    pub async fn edit_expense(
        &self,
        expense_id: ExpenseId,
        actor: &Actor,
        update: ExpenseUpdate,
    ) -> Result<Expense, LifecycleError> {
        let config = &self.ctx.config;
        let touched = with_retry(&config.retry, "edit_expense", LifecycleError::retry_class, || {
            within_timeout(
                config.transaction_timeout,
                "edit_expense",
                self.edit_attempt(expense_id, actor, update.clone()),
            )
        })
        .await?;

        self.publish(&touched).await;
        info!(%expense_id, amount = %touched.value.amount, "Expense edited");
        Ok(touched.value)
    }

    async fn edit_attempt(
        &self,
        expense_id: ExpenseId,
        actor: &Actor,
        update: ExpenseUpdate,
    ) -> Result<Touched<Expense>, LifecycleError> {
        let (block_id, owner) = self.expense_owner(expense_id).await?;
        let now = self.ctx.clock.now();
        let mut uow = self.ctx.store.begin().await?;
        let result = edit_in(uow.as_mut(), expense_id, block_id, owner, actor, update, now).await;
        settle(uow, result).await
    }

    /// Deletes an expense and reverses its effects; only its creator may do so
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn delete_expense(&self, expense_id: ExpenseId, actor: &Actor) -> Result<(), LifecycleError> {
        let config = &self.ctx.config;
        let touched = with_retry(&config.retry, "delete_expense", LifecycleError::retry_class, || {
            within_timeout(
                config.transaction_timeout,
                "delete_expense",
                self.delete_attempt(expense_id, actor),
            )
        })
        .await?;

        self.publish(&touched).await;
        info!(%expense_id, block = %touched.block.code, "Expense deleted");
        Ok(())
    }

    async fn delete_attempt(&self, expense_id: ExpenseId, actor: &Actor) -> Result<Touched<()>, LifecycleError> {
        let (block_id, owner) = self.expense_owner(expense_id).await?;
        let now = self.ctx.clock.now();
        let mut uow = self.ctx.store.begin().await?;
        let result = delete_in(uow.as_mut(), expense_id, block_id, owner, actor, now).await;
        settle(uow, result).await
    }

    /// Request that owns `block_id`, read without locks
    async fn block_owner(&self, block_id: BlockId) -> Result<Option<RequestId>, LifecycleError> {
        Ok(self.ctx.store.get_block(block_id).await?.and_then(|block| block.request_id))
    }

    async fn expense_owner(&self, expense_id: ExpenseId) -> Result<(BlockId, Option<RequestId>), LifecycleError> {
        let expense = self
            .ctx
            .store
            .get_expense(expense_id)
            .await?
            .ok_or_else(|| LifecycleError::not_found("Expense", expense_id))?;
        let owner = self.block_owner(expense.block_id).await?;
        Ok((expense.block_id, owner))
    }

    pub async fn get_expense(&self, expense_id: ExpenseId) -> Result<Expense, LifecycleError> {
        self.ctx
            .store
            .get_expense(expense_id)
            .await?
            .ok_or_else(|| LifecycleError::not_found("Expense", expense_id))
    }

    pub async fn list_expenses(&self, block_id: BlockId) -> Result<Vec<Expense>, LifecycleError> {
        if self.ctx.store.get_block(block_id).await?.is_none() {
            return Err(LifecycleError::not_found("AccountingBlock", block_id));
        }
        Ok(self.ctx.store.list_expenses(block_id).await?)
    }
}

/// Locks the owning request, then the block
///
/// `owner` was read before the unit of work began; a block that changed
/// hands in between is reported as a conflict.
async fn lock_block_chain(
    uow: &mut dyn UnitOfWork,
    block_id: BlockId,
    owner: Option<RequestId>,
) -> Result<(AccountingBlock, Request), LifecycleError> {
    let request = match owner {
        Some(request_id) => uow.lock_request(request_id).await?,
        None => None,
    };

    let block = uow
        .lock_block(block_id)
        .await?
        .ok_or_else(|| LifecycleError::not_found("AccountingBlock", block_id))?;
    block.ensure_accepts_expenses()?;

    let request_id = block
        .request_id
        .ok_or_else(|| LifecycleError::not_found("Request for block", &block.code))?;
    match request {
        Some(request) if request.id == request_id => Ok((block, request)),
        Some(_) => Err(LifecycleError::conflict(format!(
            "Block {} changed owner while the expense was being recorded",
            block.code
        ))),
        None => Err(LifecycleError::not_found("Request", request_id)),
    }
}

async fn lock_owned_expense(
    uow: &mut dyn UnitOfWork,
    expense_id: ExpenseId,
    block_id: BlockId,
    actor: &Actor,
) -> Result<Expense, LifecycleError> {
    let expense = uow
        .lock_expense(expense_id)
        .await?
        .filter(|expense| expense.block_id == block_id)
        .ok_or_else(|| LifecycleError::not_found("Expense", expense_id))?;
    expense.ensure_created_by(actor.id)?;
    Ok(expense)
}

fn ledger_key(block: &AccountingBlock, request: &Request) -> BalanceKey {
    BalanceKey::new(request.requester_id, block.company.clone())
}

async fn register_in(
    uow: &mut dyn UnitOfWork,
    block_id: BlockId,
    owner: Option<RequestId>,
    actor: &Actor,
    new: NewExpense,
    now: DateTime<Utc>,
) -> Result<Touched<Expense>, LifecycleError> {
    let (mut block, request) = lock_block_chain(uow, block_id, owner).await?;
    let expense = Expense::record(&block, new, actor.id, now)?;

    let key = ledger_key(&block, &request);
    let mut ledger = uow.lock_balance(&key, now).await?;
    ledger.debit(expense.amount, now)?;
    block.record_expense(&expense, now)?;

    uow.insert_expense(&expense).await?;
    uow.save_balance(&ledger).await?;
    uow.update_block(&block).await?;

    Ok(Touched {
        value: expense,
        block,
        key,
    })
}

async fn edit_in(
    uow: &mut dyn UnitOfWork,
    expense_id: ExpenseId,
    block_id: BlockId,
    owner: Option<RequestId>,
    actor: &Actor,
    update: ExpenseUpdate,
    now: DateTime<Utc>,
) -> Result<Touched<Expense>, LifecycleError> {
    let (mut block, request) = lock_block_chain(uow, block_id, owner).await?;
    let mut expense = lock_owned_expense(uow, expense_id, block.id, actor).await?;

    let revision = expense.apply_update(update, now)?;
    block.revise_expense(&revision, now)?;

    let key = ledger_key(&block, &request);
    if let Some(movement) = LedgerMovement::for_adjustment(revision.old_amount, revision.new_amount) {
        let mut ledger = uow.lock_balance(&key, now).await?;
        ledger.apply(movement, now)?;
        uow.save_balance(&ledger).await?;
    }

    uow.update_expense(&expense).await?;
    uow.update_block(&block).await?;

    Ok(Touched {
        value: expense,
        block,
        key,
    })
}

async fn delete_in(
    uow: &mut dyn UnitOfWork,
    expense_id: ExpenseId,
    block_id: BlockId,
    owner: Option<RequestId>,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<Touched<()>, LifecycleError> {
    let (mut block, request) = lock_block_chain(uow, block_id, owner).await?;
    let expense = lock_owned_expense(uow, expense_id, block.id, actor).await?;

    block.remove_expense(&expense, now)?;

    let key = ledger_key(&block, &request);
    let mut ledger = uow.lock_balance(&key, now).await?;
    ledger.credit(expense.amount, now)?;

    uow.delete_expense(expense.id).await?;
    uow.save_balance(&ledger).await?;
    uow.update_block(&block).await?;

    Ok(Touched {
        value: (),
        block,
        key,
    })
}
