//! In-memory lifecycle store
//!
//! One unit of work runs at a time: `begin` takes the store mutex and hands
//! out a working copy of the state, `commit` writes the copy back. Dropping
//! or rolling back a unit of work discards the copy.
//!
//! Foreign keys are emulated: deleting a request still referenced by a block,
//! or inserting an expense for a missing block, is a conflict.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use core_kernel::{
    AdapterHealth, BlockId, DomainPort, ExpenseId, HealthCheckResult, HealthCheckable, PortError,
    RequestId,
};
use domain_accounting::{AccountingBlock, Expense};
use domain_balance::{BalanceKey, UserBalance};
use domain_request::Request;

use crate::ports::{BlockFilter, LifecycleStore, RequestFilter, UnitOfWork};

/// Tables held by the memory store
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub requests: HashMap<RequestId, Request>,
    pub balances: HashMap<BalanceKey, UserBalance>,
    pub blocks: HashMap<BlockId, AccountingBlock>,
    pub expenses: HashMap<ExpenseId, Expense>,
}

impl MemoryState {
    fn latest_block(&self) -> Option<&AccountingBlock> {
        self.blocks
            .values()
            .max_by_key(|block| (block.created_at, block.code.sequence()))
    }

    fn block_for_request(&self, request_id: RequestId) -> Option<&AccountingBlock> {
        self.blocks
            .values()
            .find(|block| block.request_id == Some(request_id))
    }

    fn block_expenses(&self, block_id: BlockId) -> Vec<Expense> {
        let mut expenses: Vec<Expense> = self
            .expenses
            .values()
            .filter(|expense| expense.block_id == block_id)
            .cloned()
            .collect();
        expenses.sort_by(|a, b| a.date.cmp(&b.date).then(a.created_at.cmp(&b.created_at)));
        expenses
    }
}

#[derive(Debug, Default)]
struct FailureInjection {
    begin: AtomicU32,
    commit: AtomicU32,
}

impl FailureInjection {
    fn take(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

fn page<T>(items: Vec<T>, limit: Option<u32>, offset: Option<u32>) -> Vec<T> {
    items
        .into_iter()
        .skip(offset.unwrap_or(0) as usize)
        .take(limit.map_or(usize::MAX, |l| l as usize))
        .collect()
}

/// Lifecycle store kept in process memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
    failures: Arc<FailureInjection>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `count` calls to `begin` fail with a connection error
    pub fn fail_next_begins(&self, count: u32) {
        self.failures.begin.store(count, Ordering::SeqCst);
    }

    /// The next `count` commits fail with a connection error and discard
    /// their changes
    pub fn fail_next_commits(&self, count: u32) {
        self.failures.commit.store(count, Ordering::SeqCst);
    }

    /// Copy of the current committed state
    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }

    /// Mutates committed state directly, bypassing units of work
    pub async fn update_state<F>(&self, mutate: F)
    where
        F: FnOnce(&mut MemoryState),
    {
        mutate(&mut *self.state.lock().await);
    }

    pub async fn seed_balance(&self, balance: UserBalance) {
        self.update_state(|state| {
            state.balances.insert(balance.key(), balance);
        })
        .await;
    }
}

impl DomainPort for InMemoryStore {}

#[async_trait]
impl HealthCheckable for InMemoryStore {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult {
            adapter_id: "memory-store".to_string(),
            status: AdapterHealth::Healthy,
            latency_ms: 0,
            message: None,
            checked_at: Utc::now(),
        }
    }
}

#[async_trait]
impl LifecycleStore for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, PortError> {
        if FailureInjection::take(&self.failures.begin) {
            return Err(PortError::connection("injected failure on begin"));
        }
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryUnitOfWork {
            guard,
            working,
            failures: self.failures.clone(),
        }))
    }

    async fn get_request(&self, id: RequestId) -> Result<Option<Request>, PortError> {
        Ok(self.state.lock().await.requests.get(&id).cloned())
    }

    async fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<Request>, PortError> {
        let state = self.state.lock().await;
        let mut requests: Vec<Request> = state
            .requests
            .values()
            .filter(|request| filter.matches(request))
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page(requests, filter.limit, filter.offset))
    }

    async fn get_block(&self, id: BlockId) -> Result<Option<AccountingBlock>, PortError> {
        Ok(self.state.lock().await.blocks.get(&id).cloned())
    }

    async fn list_blocks(&self, filter: &BlockFilter) -> Result<Vec<AccountingBlock>, PortError> {
        let state = self.state.lock().await;
        let mut blocks: Vec<AccountingBlock> = state
            .blocks
            .values()
            .filter(|block| filter.matches(block))
            .cloned()
            .collect();
        blocks.sort_by(|a, b| b.code.sequence().cmp(&a.code.sequence()));
        Ok(page(blocks, filter.limit, filter.offset))
    }

    async fn block_for_request(&self, request_id: RequestId) -> Result<Option<AccountingBlock>, PortError> {
        Ok(self.state.lock().await.block_for_request(request_id).cloned())
    }

    async fn get_expense(&self, id: ExpenseId) -> Result<Option<Expense>, PortError> {
        Ok(self.state.lock().await.expenses.get(&id).cloned())
    }

    async fn list_expenses(&self, block_id: BlockId) -> Result<Vec<Expense>, PortError> {
        Ok(self.state.lock().await.block_expenses(block_id))
    }

    async fn get_balance(&self, key: &BalanceKey) -> Result<Option<UserBalance>, PortError> {
        Ok(self.state.lock().await.balances.get(key).cloned())
    }
}

/// Unit of work over a private copy of the store state
pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    failures: Arc<FailureInjection>,
}

impl MemoryUnitOfWork {
    fn missing(entity: &str, id: impl std::fmt::Display) -> PortError {
        PortError::not_found(entity, id)
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn lock_balance(&mut self, key: &BalanceKey, now: DateTime<Utc>) -> Result<UserBalance, PortError> {
        Ok(self
            .working
            .balances
            .entry(key.clone())
            .or_insert_with(|| UserBalance::zero(key.clone(), now))
            .clone())
    }

    async fn save_balance(&mut self, balance: &UserBalance) -> Result<(), PortError> {
        self.working.balances.insert(balance.key(), balance.clone());
        Ok(())
    }

    async fn lock_request(&mut self, id: RequestId) -> Result<Option<Request>, PortError> {
        Ok(self.working.requests.get(&id).cloned())
    }

    async fn insert_request(&mut self, request: &Request) -> Result<(), PortError> {
        if self.working.requests.contains_key(&request.id) {
            return Err(PortError::conflict(format!("request {} already exists", request.id)));
        }
        self.working.requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn update_request(&mut self, request: &Request) -> Result<(), PortError> {
        match self.working.requests.get_mut(&request.id) {
            Some(stored) => {
                *stored = request.clone();
                Ok(())
            }
            None => Err(Self::missing("Request", request.id)),
        }
    }

    async fn delete_request(&mut self, id: RequestId) -> Result<(), PortError> {
        if self.working.block_for_request(id).is_some() {
            return Err(PortError::conflict(format!("request {} is still referenced by a block", id)));
        }
        self.working
            .requests
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Self::missing("Request", id))
    }

    async fn lock_block(&mut self, id: BlockId) -> Result<Option<AccountingBlock>, PortError> {
        Ok(self.working.blocks.get(&id).cloned())
    }

    async fn block_for_request(&mut self, request_id: RequestId) -> Result<Option<AccountingBlock>, PortError> {
        Ok(self.working.block_for_request(request_id).cloned())
    }

    async fn latest_block_code(&mut self) -> Result<Option<String>, PortError> {
        Ok(self.working.latest_block().map(|block| block.code.to_string()))
    }

    async fn insert_block(&mut self, block: &AccountingBlock) -> Result<(), PortError> {
        if self.working.blocks.values().any(|b| b.code == block.code) {
            return Err(PortError::conflict(format!("block code {} already in use", block.code)));
        }
        if let Some(request_id) = block.request_id {
            if !self.working.requests.contains_key(&request_id) {
                return Err(PortError::conflict(format!("block references missing request {}", request_id)));
            }
        }
        self.working.blocks.insert(block.id, block.clone());
        Ok(())
    }

    async fn update_block(&mut self, block: &AccountingBlock) -> Result<(), PortError> {
        match self.working.blocks.get_mut(&block.id) {
            Some(stored) => {
                *stored = block.clone();
                Ok(())
            }
            None => Err(Self::missing("AccountingBlock", block.id)),
        }
    }

    async fn lock_expense(&mut self, id: ExpenseId) -> Result<Option<Expense>, PortError> {
        Ok(self.working.expenses.get(&id).cloned())
    }

    async fn block_expenses(&mut self, block_id: BlockId) -> Result<Vec<Expense>, PortError> {
        Ok(self.working.block_expenses(block_id))
    }

    async fn insert_expense(&mut self, expense: &Expense) -> Result<(), PortError> {
        if !self.working.blocks.contains_key(&expense.block_id) {
            return Err(PortError::conflict(format!(
                "expense references missing block {}",
                expense.block_id
            )));
        }
        self.working.expenses.insert(expense.id, expense.clone());
        Ok(())
    }

    async fn update_expense(&mut self, expense: &Expense) -> Result<(), PortError> {
        match self.working.expenses.get_mut(&expense.id) {
            Some(stored) => {
                *stored = expense.clone();
                Ok(())
            }
            None => Err(Self::missing("Expense", expense.id)),
        }
    }

    async fn delete_expense(&mut self, id: ExpenseId) -> Result<(), PortError> {
        self.working
            .expenses
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Self::missing("Expense", id))
    }

    async fn delete_block_expenses(&mut self, block_id: BlockId) -> Result<u64, PortError> {
        let before = self.working.expenses.len();
        self.working.expenses.retain(|_, expense| expense.block_id != block_id);
        Ok((before - self.working.expenses.len()) as u64)
    }

    async fn commit(self: Box<Self>) -> Result<(), PortError> {
        let MemoryUnitOfWork {
            mut guard,
            working,
            failures,
        } = *self;
        if FailureInjection::take(&failures.commit) {
            return Err(PortError::connection("injected failure on commit"));
        }
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), PortError> {
        Ok(())
    }
}
