//! Lifecycle services for the expense advance engine
//!
//! Orchestrates requests, ledger balances and accounting blocks inside
//! transactional units of work:
//! - Request creation and status transitions, with ledger funding and block
//!   creation on acceptance
//! - Expense registration, edits and deletions
//! - Block closing with statement generation
//! - Reimbursement initiation for negative blocks
//! - Cached balance reads

pub mod ports;
pub mod error;
pub mod config;
pub mod transaction;
pub mod events;
pub mod services;
pub mod adapters;

pub use ports::{
    BlockFilter, DeliveryReceipt, DocumentGenerator, DocumentStorage, GeneratedDocument,
    IdentityResolver, LifecycleStore, Notifier, Recipient, RequestFilter, UnitOfWork,
};
pub use error::LifecycleError;
pub use config::LifecycleConfig;
pub use events::{EventBus, LifecycleEvent, LifecycleListener};
pub use services::{
    BalanceService, BlockDetails, BlockService, CloseOutcome, CreateRequest, ExpenseService,
    ReimbursementResult, ReimbursementService, RequestService, ServiceContext, Services,
    TransitionResult,
};
