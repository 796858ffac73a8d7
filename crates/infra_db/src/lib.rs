//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the expense advance engine, built on SQLx.
//!
//! # Architecture
//!
//! The crate follows the repository pattern. Repositories in
//! [`repositories`] hold the SQL and work on any executor, so the same
//! statement runs on the pool or inside a transaction. The adapters in
//! [`adapters`] implement the lifecycle ports on top of them.
//!
//! # Concurrency
//!
//! Mutations run in one transaction per unit of work. Rows are locked with
//! `SELECT ... FOR UPDATE` before they are changed, and block codes are
//! allocated under a transaction-scoped advisory lock.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PgLifecycleStore};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/expense_advance")).await?;
//! run_migrations(&pool).await?;
//! let store = PgLifecycleStore::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{DatabasePool, create_pool, run_migrations, DatabaseConfig};
pub use error::DatabaseError;
pub use adapters::{PgDirectory, PgLifecycleStore, PgUnitOfWork};
