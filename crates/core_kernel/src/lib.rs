//! Core Kernel - Foundational types for the expense advance engine
//!
//! This crate provides the building blocks used across all domain crates:
//! - Money with precise decimal arithmetic
//! - Strongly-typed identifiers
//! - Injectable clocks
//! - Port error types and the retry combinator

pub mod money;
pub mod identifiers;
pub mod clock;
pub mod ports;
pub mod retry;

pub use money::{Money, MoneyError};
pub use identifiers::{RequestId, BlockId, ExpenseId, UserId, Company};
pub use clock::{Clock, SystemClock, ManualClock};
pub use ports::{PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth};
pub use retry::{with_retry, RetryClass, RetryPolicy};
