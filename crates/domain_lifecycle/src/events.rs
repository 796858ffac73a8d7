//! Lifecycle events
//!
//! Services publish events after their unit of work commits. Listeners use
//! them to drop derived state such as cached balances; they never take part
//! in the transaction that produced the change.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use core_kernel::{BlockId, RequestId};
use domain_accounting::BlockStatus;
use domain_balance::{BalanceCache, BalanceKey};
use domain_request::RequestStatus;

/// A committed change to lifecycle state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    BalanceChanged {
        key: BalanceKey,
    },
    /// `status` is `None` once the request has been deleted
    RequestChanged {
        request_id: RequestId,
        status: Option<RequestStatus>,
    },
    BlockChanged {
        block_id: BlockId,
        status: BlockStatus,
    },
}

/// Receives committed lifecycle events
#[async_trait]
pub trait LifecycleListener: Send + Sync {
    async fn on_event(&self, event: &LifecycleEvent);
}

#[async_trait]
impl LifecycleListener for BalanceCache {
    async fn on_event(&self, event: &LifecycleEvent) {
        if let LifecycleEvent::BalanceChanged { key } = event {
            self.invalidate(key).await;
        }
    }
}

/// Fan-out to registered listeners
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Vec<Arc<dyn LifecycleListener>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: Arc<dyn LifecycleListener>) {
        self.listeners.push(listener);
    }

    pub async fn publish(&self, events: &[LifecycleEvent]) {
        for event in events {
            debug!(?event, "Publishing lifecycle event");
            for listener in &self.listeners {
                listener.on_event(event).await;
            }
        }
    }
}
