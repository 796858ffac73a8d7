//! Lifecycle tuning

use std::time::Duration;

use core_kernel::RetryPolicy;

/// Timeouts, retry policy and cache lifetime for the lifecycle services
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Budget for one attempt of a request or expense transaction
    pub transaction_timeout: Duration,
    /// Budget for one close attempt, document generation included
    pub close_timeout: Duration,
    /// Budget for a single notification send
    pub notify_timeout: Duration,
    pub retry: RetryPolicy,
    /// Lifetime of cached balance reads
    pub cache_ttl: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            transaction_timeout: Duration::from_secs(30),
            close_timeout: Duration::from_secs(60),
            notify_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            cache_ttl: Duration::from_secs(30),
        }
    }
}

impl LifecycleConfig {
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_transaction_timeout(mut self, timeout: Duration) -> Self {
        self.transaction_timeout = timeout;
        self
    }

    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    pub fn with_notify_timeout(mut self, timeout: Duration) -> Self {
        self.notify_timeout = timeout;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }
}
