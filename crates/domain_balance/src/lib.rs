//! Balance Ledger Domain
//!
//! Each employee holds one signed balance per company. Accepting a request
//! draws on it, registering expenses decrements it, and editing or deleting
//! expenses applies the difference back. A balance below zero means the
//! employee owes the company.
//!
//! Rows are created lazily: a missing row is a zero balance.

pub mod balance;
pub mod cache;
pub mod error;

pub use balance::{BalanceKey, UserBalance, LedgerMovement};
pub use cache::BalanceCache;
pub use error::BalanceError;
