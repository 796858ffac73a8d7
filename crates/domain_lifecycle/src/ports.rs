//! Lifecycle Ports
//!
//! The lifecycle services depend only on the traits in this module. The
//! workspace ships two store adapters:
//!
//! - **Postgres** (`infra_db::PgLifecycleStore`): row locks via
//!   `SELECT ... FOR UPDATE` inside a `sqlx` transaction
//! - **Memory** ([`crate::adapters::InMemoryStore`]): one unit of work at a
//!   time over a cloned snapshot
//!
//! # Units of work
//!
//! Every mutation runs inside one [`UnitOfWork`]. Reads through a unit of work
//! see fresh, locked state; the plain [`LifecycleStore`] reads are for the
//! query side and never participate in a transaction.
//!
//! ```rust,ignore
//! let mut uow = store.begin().await?;
//! let mut balance = uow.lock_balance(&key, now).await?;
//! balance.debit(amount, now)?;
//! uow.save_balance(&balance).await?;
//! uow.commit().await?;
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{
    BlockId, Company, DomainPort, ExpenseId, HealthCheckable, PortError, RequestId, UserId,
};
use domain_accounting::{AccountingBlock, BlockStatus, ClosingStatement, Expense};
use domain_balance::{BalanceKey, UserBalance};
use domain_request::{Actor, Request, RequestStatus, RequestType};

/// Filters for listing requests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
    pub request_type: Option<RequestType>,
    pub requester_id: Option<UserId>,
    pub company: Option<Company>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl RequestFilter {
    pub fn by_requester(requester_id: UserId) -> Self {
        Self {
            requester_id: Some(requester_id),
            ..Default::default()
        }
    }

    pub fn by_status(status: RequestStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn matches(&self, request: &Request) -> bool {
        self.status.map_or(true, |s| request.status == s)
            && self.request_type.map_or(true, |t| request.request_type == t)
            && self.requester_id.map_or(true, |r| request.requester_id == r)
            && self.company.as_ref().map_or(true, |c| &request.company == c)
    }
}

/// Filters for listing accounting blocks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockFilter {
    pub status: Option<BlockStatus>,
    pub company: Option<Company>,
    pub responsible_id: Option<UserId>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl BlockFilter {
    pub fn matches(&self, block: &AccountingBlock) -> bool {
        self.status.map_or(true, |s| block.status == s)
            && self.company.as_ref().map_or(true, |c| &block.company == c)
            && self.responsible_id.map_or(true, |r| block.responsible_id == r)
    }
}

/// One atomic unit of work against the lifecycle tables
///
/// Dropping a unit of work without committing discards its changes.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Locks the ledger row for `key`, creating it at zero when missing
    async fn lock_balance(&mut self, key: &BalanceKey, now: DateTime<Utc>) -> Result<UserBalance, PortError>;
    async fn save_balance(&mut self, balance: &UserBalance) -> Result<(), PortError>;

    async fn lock_request(&mut self, id: RequestId) -> Result<Option<Request>, PortError>;
    async fn insert_request(&mut self, request: &Request) -> Result<(), PortError>;
    async fn update_request(&mut self, request: &Request) -> Result<(), PortError>;
    async fn delete_request(&mut self, id: RequestId) -> Result<(), PortError>;

    async fn lock_block(&mut self, id: BlockId) -> Result<Option<AccountingBlock>, PortError>;
    async fn block_for_request(&mut self, request_id: RequestId) -> Result<Option<AccountingBlock>, PortError>;
    /// Code of the most recently created block, serialising code allocation
    /// until the unit of work ends
    async fn latest_block_code(&mut self) -> Result<Option<String>, PortError>;
    async fn insert_block(&mut self, block: &AccountingBlock) -> Result<(), PortError>;
    async fn update_block(&mut self, block: &AccountingBlock) -> Result<(), PortError>;

    async fn lock_expense(&mut self, id: ExpenseId) -> Result<Option<Expense>, PortError>;
    async fn block_expenses(&mut self, block_id: BlockId) -> Result<Vec<Expense>, PortError>;
    async fn insert_expense(&mut self, expense: &Expense) -> Result<(), PortError>;
    async fn update_expense(&mut self, expense: &Expense) -> Result<(), PortError>;
    async fn delete_expense(&mut self, id: ExpenseId) -> Result<(), PortError>;
    async fn delete_block_expenses(&mut self, block_id: BlockId) -> Result<u64, PortError>;

    async fn commit(self: Box<Self>) -> Result<(), PortError>;
    async fn rollback(self: Box<Self>) -> Result<(), PortError>;
}

/// Persistent store of requests, balances, blocks and expenses
#[async_trait]
pub trait LifecycleStore: DomainPort + HealthCheckable {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, PortError>;

    async fn get_request(&self, id: RequestId) -> Result<Option<Request>, PortError>;
    async fn list_requests(&self, filter: &RequestFilter) -> Result<Vec<Request>, PortError>;

    async fn get_block(&self, id: BlockId) -> Result<Option<AccountingBlock>, PortError>;
    async fn list_blocks(&self, filter: &BlockFilter) -> Result<Vec<AccountingBlock>, PortError>;
    async fn block_for_request(&self, request_id: RequestId) -> Result<Option<AccountingBlock>, PortError>;

    async fn get_expense(&self, id: ExpenseId) -> Result<Option<Expense>, PortError>;
    async fn list_expenses(&self, block_id: BlockId) -> Result<Vec<Expense>, PortError>;

    async fn get_balance(&self, key: &BalanceKey) -> Result<Option<UserBalance>, PortError>;
}

/// Addressee of a notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub user_id: UserId,
    pub display_name: String,
    pub email: Option<String>,
}

impl From<&Actor> for Recipient {
    fn from(actor: &Actor) -> Self {
        Self {
            user_id: actor.id,
            display_name: actor.display_name.clone(),
            email: actor.email.clone(),
        }
    }
}

/// Acknowledgement returned by a notification channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub id: String,
    pub status: String,
}

/// Outbound message channel
#[async_trait]
pub trait Notifier: DomainPort {
    async fn send(&self, recipient: &Recipient, message: &str) -> Result<DeliveryReceipt, PortError>;
}

/// A rendered document ready for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedDocument {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Renders the closing statement of a block
#[async_trait]
pub trait DocumentGenerator: DomainPort {
    async fn generate(
        &self,
        statement: &ClosingStatement,
        company_name: &str,
        responsible_name: &str,
    ) -> Result<GeneratedDocument, PortError>;
}

/// Stores generated documents and returns a public URL
#[async_trait]
pub trait DocumentStorage: DomainPort {
    async fn upload(&self, bytes: Vec<u8>, filename: &str, content_type: &str) -> Result<String, PortError>;
}

/// Resolves user ids into actors with names, emails and roles
#[async_trait]
pub trait IdentityResolver: DomainPort {
    async fn resolve(&self, user_id: UserId) -> Result<Actor, PortError>;
}
