//! Lifecycle services
//!
//! Each service method is one business operation. Mutations follow the same
//! shape:
//!
//! 1. `with_retry` around the whole attempt (transient storage errors only)
//! 2. `within_timeout` around one attempt
//! 3. `begin -> body -> settle` inside the attempt
//! 4. events published and notifications sent after the commit
//!
//! Queries read the store directly and never open a unit of work, except
//! the balance read that lazily creates a missing ledger row.

pub mod requests;
pub mod expenses;
pub mod blocks;
pub mod reimbursements;
pub mod balances;

use std::sync::Arc;

use tracing::{debug, warn};

use core_kernel::{Clock, RequestId, SystemClock};
use domain_balance::BalanceCache;
use domain_request::{Notice, NotificationRecord, Request};

use crate::config::LifecycleConfig;
use crate::error::LifecycleError;
use crate::events::{EventBus, LifecycleListener};
use crate::ports::{
    DocumentGenerator, DocumentStorage, IdentityResolver, LifecycleStore, Notifier, Recipient,
};
use crate::transaction::{settle, within_timeout};

pub use requests::{CreateRequest, RequestService, TransitionResult};
pub use expenses::ExpenseService;
pub use blocks::{BlockDetails, BlockService, CloseOutcome};
pub use reimbursements::{ReimbursementResult, ReimbursementService};
pub use balances::BalanceService;

/// Collaborators shared by every service
#[derive(Clone)]
pub struct ServiceContext {
    pub store: Arc<dyn LifecycleStore>,
    pub notifier: Arc<dyn Notifier>,
    pub documents: Arc<dyn DocumentGenerator>,
    pub storage: Arc<dyn DocumentStorage>,
    pub identity: Arc<dyn IdentityResolver>,
    pub clock: Arc<dyn Clock>,
    pub events: EventBus,
    pub config: LifecycleConfig,
}

impl ServiceContext {
    pub fn new(
        store: Arc<dyn LifecycleStore>,
        notifier: Arc<dyn Notifier>,
        documents: Arc<dyn DocumentGenerator>,
        storage: Arc<dyn DocumentStorage>,
        identity: Arc<dyn IdentityResolver>,
    ) -> Self {
        Self {
            store,
            notifier,
            documents,
            storage,
            identity,
            clock: Arc::new(SystemClock),
            events: EventBus::new(),
            config: LifecycleConfig::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_config(mut self, config: LifecycleConfig) -> Self {
        self.config = config;
        self
    }

    pub fn subscribe(mut self, listener: Arc<dyn LifecycleListener>) -> Self {
        self.events.subscribe(listener);
        self
    }

    /// Sends `notice` and reports the outcome as a correlation record
    ///
    /// Never fails: lookup, delivery and timeout errors all end up in the
    /// returned record.
    pub(crate) async fn dispatch(&self, notice: Notice) -> NotificationRecord {
        let recipient = match self.identity.resolve(notice.recipient).await {
            Ok(actor) => Recipient::from(&actor),
            Err(error) => {
                warn!(recipient = %notice.recipient, error = %error, "Notification recipient lookup failed");
                return NotificationRecord::failed(format!("recipient lookup failed: {}", error));
            }
        };

        let budget = self.config.notify_timeout;
        match tokio::time::timeout(budget, self.notifier.send(&recipient, &notice.message)).await {
            Ok(Ok(receipt)) => {
                debug!(recipient = %recipient.user_id, message_id = %receipt.id, "Notification sent");
                NotificationRecord::sent(receipt.id)
            }
            Ok(Err(error)) => {
                warn!(recipient = %recipient.user_id, error = %error, "Notification failed");
                NotificationRecord::failed(error.to_string())
            }
            Err(_) => {
                warn!(recipient = %recipient.user_id, timeout_ms = budget.as_millis() as u64, "Notification timed out");
                NotificationRecord::failed(format!("notification timed out after {}ms", budget.as_millis()))
            }
        }
    }
}

impl ServiceContext {
    /// Sends `notice` for a committed mutation and stores the outcome on
    /// `request`
    ///
    /// Runs once per operation, after its retries are over. The record is
    /// written in its own unit of work; failing to store it is logged and
    /// leaves the committed mutation untouched.
    pub(crate) async fn notify_committed(&self, request: &mut Request, notice: Notice) {
        let record = self.dispatch(notice).await;
        request.record_notification(record.clone());

        let stored = within_timeout(
            self.config.transaction_timeout,
            "record_notification",
            self.store_notification(request.id, record),
        )
        .await;
        if let Err(error) = stored {
            warn!(request_id = %request.id, error = %error, "Could not store notification record");
        }
    }

    async fn store_notification(&self, request_id: RequestId, record: NotificationRecord) -> Result<(), LifecycleError> {
        let mut uow = self.store.begin().await?;
        let result = match uow.lock_request(request_id).await {
            Ok(Some(mut request)) => {
                request.record_notification(record);
                uow.update_request(&request).await.map_err(LifecycleError::from)
            }
            Ok(None) => Ok(()),
            Err(error) => Err(error.into()),
        };
        settle(uow, result).await
    }
}

/// All lifecycle services wired to one context
#[derive(Clone)]
pub struct Services {
    pub requests: RequestService,
    pub expenses: ExpenseService,
    pub blocks: BlockService,
    pub reimbursements: ReimbursementService,
    pub balances: BalanceService,
}

impl Services {
    /// Wires the services and registers the balance cache as an event
    /// listener
    pub fn new(context: ServiceContext) -> Self {
        let ttl = chrono::Duration::from_std(context.config.cache_ttl)
            .unwrap_or_else(|_| chrono::Duration::seconds(30));
        let cache = BalanceCache::new(context.clock.clone(), ttl);
        let context = Arc::new(context.subscribe(Arc::new(cache.clone())));

        Self {
            requests: RequestService::new(context.clone()),
            expenses: ExpenseService::new(context.clone()),
            blocks: BlockService::new(context.clone()),
            reimbursements: ReimbursementService::new(context.clone()),
            balances: BalanceService::new(context, cache),
        }
    }
}
