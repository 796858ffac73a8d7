//! Read-side balance cache
//!
//! Balance reads are frequent and cheap to serve from memory. Entries expire
//! after a fixed TTL measured against an injected [`Clock`], and writers drop
//! the affected entries once their transaction has committed.
//!
//! Every invalidation bumps a generation counter. A read-through takes the
//! generation before it reads the store and only caches its row if no
//! invalidation ran in between, so a row read before a commit is never
//! cached after that commit's invalidation.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use core_kernel::{Clock, UserId};
use crate::balance::{BalanceKey, UserBalance};

#[derive(Debug, Clone)]
struct CachedBalance {
    balance: UserBalance,
    cached_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<BalanceKey, CachedBalance>,
    generation: u64,
}

impl CacheState {
    fn store(&mut self, balance: UserBalance, cached_at: DateTime<Utc>) {
        self.entries.insert(balance.key(), CachedBalance { balance, cached_at });
    }
}

/// TTL cache of ledger rows keyed by (user, company)
#[derive(Debug, Clone)]
pub struct BalanceCache {
    state: Arc<RwLock<CacheState>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl BalanceCache {
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            state: Arc::new(RwLock::new(CacheState::default())),
            clock,
            ttl,
        }
    }

    /// Returns the cached row if it has not expired
    pub async fn get(&self, key: &BalanceKey) -> Option<UserBalance> {
        let now = self.clock.now();
        let state = self.state.read().await;
        state
            .entries
            .get(key)
            .filter(|entry| now - entry.cached_at < self.ttl)
            .map(|entry| entry.balance.clone())
    }

    pub async fn insert(&self, balance: UserBalance) {
        let cached_at = self.clock.now();
        self.state.write().await.store(balance, cached_at);
    }

    /// Current generation; take it before reading the store
    pub async fn generation(&self) -> u64 {
        self.state.read().await.generation
    }

    /// Caches `balance` unless an invalidation ran after `generation` was
    /// taken. Returns whether the row was cached.
    pub async fn insert_if_fresh(&self, balance: UserBalance, generation: u64) -> bool {
        let cached_at = self.clock.now();
        let mut state = self.state.write().await;
        if state.generation != generation {
            debug!(user_id = %balance.user_id, "Stale balance read not cached");
            return false;
        }
        state.store(balance, cached_at);
        true
    }

    pub async fn invalidate(&self, key: &BalanceKey) {
        let mut state = self.state.write().await;
        state.generation += 1;
        if state.entries.remove(key).is_some() {
            debug!(user_id = %key.user_id, company = %key.company, "Balance cache entry invalidated");
        }
    }

    /// Drops every company entry for one user
    pub async fn invalidate_user(&self, user_id: &UserId) {
        let mut state = self.state.write().await;
        state.generation += 1;
        state.entries.retain(|key, _| &key.user_id != user_id);
    }

    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.generation += 1;
        state.entries.clear();
    }

    /// Number of live (unexpired) entries
    pub async fn len(&self) -> usize {
        let now = self.clock.now();
        self.state
            .read()
            .await
            .entries
            .values()
            .filter(|entry| now - entry.cached_at < self.ttl)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
