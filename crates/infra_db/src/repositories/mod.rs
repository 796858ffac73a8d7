//! Table access for the lifecycle entities
//!
//! Repositories hold SQL only. They take any `PgExecutor`, so a statement
//! runs the same way on the pool and inside a unit-of-work transaction, and
//! they speak in row types that the adapters map to domain values.

pub mod requests;
pub mod balances;
pub mod blocks;
pub mod expenses;

pub use requests::{RequestQuery, RequestRepository, RequestRow};
pub use balances::{BalanceRepository, BalanceRow};
pub use blocks::{BlockQuery, BlockRepository, BlockRow};
pub use expenses::{ExpenseRepository, ExpenseRow};
