//! PostgreSQL Lifecycle Store
//!
//! Implements the lifecycle ports on top of the repositories. A unit of work
//! wraps one `sqlx` transaction: every `lock_*` call is a
//! `SELECT ... FOR UPDATE`, and block code allocation is serialised with a
//! transaction-scoped advisory lock.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, DatabaseConfig, PgLifecycleStore};
//! use std::sync::Arc;
//!
//! let pool = create_pool(DatabaseConfig::new(url)).await?;
//! let store: Arc<dyn LifecycleStore> = Arc::new(PgLifecycleStore::new(pool));
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, instrument};

use core_kernel::{
    AdapterHealth, BlockId, DomainPort, ExpenseId, HealthCheckResult, HealthCheckable, PortError, RequestId,
};
use domain_accounting::{AccountingBlock, Expense};
use domain_balance::{BalanceKey, UserBalance};
use domain_lifecycle::{BlockFilter, LifecycleStore, RequestFilter, UnitOfWork};
use domain_request::Request;

use super::mapping::{
    balance_from_row, balance_to_row, block_from_row, block_status_to_db, block_to_row, expense_from_row,
    expense_to_row, request_from_row, request_status_to_db, request_to_row, request_type_to_db,
};
use crate::error::DatabaseError;
use crate::repositories::{
    BalanceRepository, BlockQuery, BlockRepository, ExpenseRepository, RequestQuery, RequestRepository,
};

fn request_query(filter: &RequestFilter) -> RequestQuery {
    RequestQuery {
        status: filter.status.map(request_status_to_db),
        request_type: filter.request_type.map(request_type_to_db),
        requester_id: filter.requester_id.map(Into::into),
        company: filter.company.as_ref().map(|c| c.as_str().to_string()),
        limit: filter.limit.map(i64::from),
        offset: filter.offset.map(i64::from),
    }
}

fn block_query(filter: &BlockFilter) -> BlockQuery {
    BlockQuery {
        status: filter.status.map(block_status_to_db),
        company: filter.company.as_ref().map(|c| c.as_str().to_string()),
        responsible_id: filter.responsible_id.map(Into::into),
        limit: filter.limit.map(i64::from),
        offset: filter.offset.map(i64::from),
    }
}

/// PostgreSQL-backed [`LifecycleStore`]
#[derive(Debug, Clone)]
pub struct PgLifecycleStore {
    pool: PgPool,
}

impl PgLifecycleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl DomainPort for PgLifecycleStore {}

#[async_trait]
impl HealthCheckable for PgLifecycleStore {
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult {
                adapter_id: "postgres-lifecycle-store".to_string(),
                status: AdapterHealth::Healthy,
                latency_ms,
                message: None,
                checked_at: Utc::now(),
            },
            Err(e) => HealthCheckResult {
                adapter_id: "postgres-lifecycle-store".to_string(),
                status: AdapterHealth::Unhealthy,
                latency_ms,
                message: Some(format!("Database error: {}", e)),
                checked_at: Utc::now(),
            },
        }
    }
}

#[async_trait]
impl LifecycleStore for PgLifecycleStore {
    #[instrument(skip(self))]
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, PortError> {
        let tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }

    async fn get_request(&self, id: RequestId) -> Result<Option<Request>, PortError> {
        let row = RequestRepository::find(&self.pool, id.into()).await?;
        Ok(row.map(request_from_row))
    }

    #[instrument(skip(self))]
    async fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<Request>, PortError> {
        let rows = RequestRepository::list(&self.pool, &request_query(filter)).await?;
        debug!(count = rows.len(), "Listed requests");
        Ok(rows.into_iter().map(request_from_row).collect())
    }

    async fn get_block(&self, id: BlockId) -> Result<Option<AccountingBlock>, PortError> {
        let row = BlockRepository::find(&self.pool, id.into()).await?;
        Ok(row.map(block_from_row).transpose()?)
    }

    #[instrument(skip(self))]
    async fn list_blocks(&self, filter: &BlockFilter) -> Result<Vec<AccountingBlock>, PortError> {
        let rows = BlockRepository::list(&self.pool, &block_query(filter)).await?;
        let blocks = rows
            .into_iter()
            .map(block_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(blocks)
    }

    async fn block_for_request(&self, request_id: RequestId) -> Result<Option<AccountingBlock>, PortError> {
        let row = BlockRepository::find_by_request(&self.pool, request_id.into()).await?;
        Ok(row.map(block_from_row).transpose()?)
    }

    async fn get_expense(&self, id: ExpenseId) -> Result<Option<Expense>, PortError> {
        let row = ExpenseRepository::find(&self.pool, id.into()).await?;
        Ok(row.map(expense_from_row))
    }

    async fn list_expenses(&self, block_id: BlockId) -> Result<Vec<Expense>, PortError> {
        let rows = ExpenseRepository::for_block(&self.pool, block_id.into()).await?;
        Ok(rows.into_iter().map(expense_from_row).collect())
    }

    async fn get_balance(&self, key: &BalanceKey) -> Result<Option<UserBalance>, PortError> {
        let row = BalanceRepository::find(&self.pool, key.user_id.into(), key.company.as_str()).await?;
        Ok(row.map(balance_from_row))
    }
}

/// One PostgreSQL transaction
///
/// Dropping it without `commit` rolls the transaction back.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn lock_balance(&mut self, key: &BalanceKey, now: DateTime<Utc>) -> Result<UserBalance, PortError> {
        let user_id = key.user_id.into();
        BalanceRepository::ensure(&mut *self.tx, user_id, key.company.as_str(), now).await?;
        let row = BalanceRepository::lock(&mut *self.tx, user_id, key.company.as_str()).await?;
        Ok(balance_from_row(row))
    }

    async fn save_balance(&mut self, balance: &UserBalance) -> Result<(), PortError> {
        BalanceRepository::save(&mut *self.tx, &balance_to_row(balance)).await?;
        Ok(())
    }

    async fn lock_request(&mut self, id: RequestId) -> Result<Option<Request>, PortError> {
        let row = RequestRepository::lock(&mut *self.tx, id.into()).await?;
        Ok(row.map(request_from_row))
    }

    async fn insert_request(&mut self, request: &Request) -> Result<(), PortError> {
        RequestRepository::insert(&mut *self.tx, &request_to_row(request)).await?;
        Ok(())
    }

    async fn update_request(&mut self, request: &Request) -> Result<(), PortError> {
        RequestRepository::update(&mut *self.tx, &request_to_row(request)).await?;
        Ok(())
    }

    async fn delete_request(&mut self, id: RequestId) -> Result<(), PortError> {
        RequestRepository::delete(&mut *self.tx, id.into()).await?;
        Ok(())
    }

    async fn lock_block(&mut self, id: BlockId) -> Result<Option<AccountingBlock>, PortError> {
        let row = BlockRepository::lock(&mut *self.tx, id.into()).await?;
        Ok(row.map(block_from_row).transpose()?)
    }

    async fn block_for_request(&mut self, request_id: RequestId) -> Result<Option<AccountingBlock>, PortError> {
        let row = BlockRepository::lock_by_request(&mut *self.tx, request_id.into()).await?;
        Ok(row.map(block_from_row).transpose()?)
    }

    async fn latest_block_code(&mut self) -> Result<Option<String>, PortError> {
        BlockRepository::lock_code_sequence(&mut *self.tx).await?;
        Ok(BlockRepository::latest_code(&mut *self.tx).await?)
    }

    async fn insert_block(&mut self, block: &AccountingBlock) -> Result<(), PortError> {
        BlockRepository::insert(&mut *self.tx, &block_to_row(block)).await?;
        Ok(())
    }

    async fn update_block(&mut self, block: &AccountingBlock) -> Result<(), PortError> {
        BlockRepository::update(&mut *self.tx, &block_to_row(block)).await?;
        Ok(())
    }

    async fn lock_expense(&mut self, id: ExpenseId) -> Result<Option<Expense>, PortError> {
        let row = ExpenseRepository::lock(&mut *self.tx, id.into()).await?;
        Ok(row.map(expense_from_row))
    }

    async fn block_expenses(&mut self, block_id: BlockId) -> Result<Vec<Expense>, PortError> {
        let rows = ExpenseRepository::for_block(&mut *self.tx, block_id.into()).await?;
        Ok(rows.into_iter().map(expense_from_row).collect())
    }

    async fn insert_expense(&mut self, expense: &Expense) -> Result<(), PortError> {
        ExpenseRepository::insert(&mut *self.tx, &expense_to_row(expense)).await?;
        Ok(())
    }

    async fn update_expense(&mut self, expense: &Expense) -> Result<(), PortError> {
        ExpenseRepository::update(&mut *self.tx, &expense_to_row(expense)).await?;
        Ok(())
    }

    async fn delete_expense(&mut self, id: ExpenseId) -> Result<(), PortError> {
        ExpenseRepository::delete(&mut *self.tx, id.into()).await?;
        Ok(())
    }

    async fn delete_block_expenses(&mut self, block_id: BlockId) -> Result<u64, PortError> {
        Ok(ExpenseRepository::delete_for_block(&mut *self.tx, block_id.into()).await?)
    }

    async fn commit(self: Box<Self>) -> Result<(), PortError> {
        self.tx.commit().await.map_err(DatabaseError::from)?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), PortError> {
        self.tx.rollback().await.map_err(DatabaseError::from)?;
        Ok(())
    }
}
