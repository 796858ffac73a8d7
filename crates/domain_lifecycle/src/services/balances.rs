//! Balance reads
//!
//! Served through the TTL cache. Mutating services never come here; they
//! lock the ledger row inside their own unit of work and invalidate the
//! cached row after commit.

use std::sync::Arc;

use tracing::{debug, instrument};

use core_kernel::{with_retry, Company, UserId};
use domain_balance::{BalanceCache, BalanceKey, UserBalance};

use crate::error::LifecycleError;
use crate::services::ServiceContext;
use crate::transaction::{settle, within_timeout};

#[derive(Clone)]
pub struct BalanceService {
    ctx: Arc<ServiceContext>,
    cache: BalanceCache,
}

impl BalanceService {
    pub fn new(ctx: Arc<ServiceContext>, cache: BalanceCache) -> Self {
        Self { ctx, cache }
    }

    /// Current ledger row for (user, company), created at zero when missing
    #[instrument(skip(self))]
    pub async fn get_balance(&self, user_id: UserId, company: Company) -> Result<UserBalance, LifecycleError> {
        if company.is_blank() {
            return Err(LifecycleError::Validation("company is required".to_string()));
        }
        let key = BalanceKey::new(user_id, company);

        if let Some(cached) = self.cache.get(&key).await {
            debug!("Balance served from cache");
            return Ok(cached);
        }

        let generation = self.cache.generation().await;
        let balance = match self.ctx.store.get_balance(&key).await? {
            Some(balance) => balance,
            None => self.create_row(&key).await?,
        };
        self.cache.insert_if_fresh(balance.clone(), generation).await;
        Ok(balance)
    }

    async fn create_row(&self, key: &BalanceKey) -> Result<UserBalance, LifecycleError> {
        let ctx = &self.ctx;
        with_retry(&ctx.config.retry, "create_balance", LifecycleError::retry_class, move || {
            within_timeout(ctx.config.transaction_timeout, "create_balance", async move {
                let now = ctx.clock.now();
                let mut uow = ctx.store.begin().await?;
                let result = uow.lock_balance(key, now).await.map_err(LifecycleError::from);
                settle(uow, result).await
            })
        })
        .await
    }

    pub fn cache(&self) -> &BalanceCache {
        &self.cache
    }
}
