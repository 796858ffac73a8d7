//! Port Adapters
//!
//! PostgreSQL implementations of the lifecycle ports:
//!
//! - [`PgLifecycleStore`]: requests, balances, blocks and expenses
//! - [`PgDirectory`]: actor resolution from user profiles
//!
//! Each adapter translates rows through [`mapping`] and converts
//! `DatabaseError` into `PortError` at the port boundary.
//!
//! # Usage
//!
//! ```rust,ignore
//! use infra_db::adapters::{PgDirectory, PgLifecycleStore};
//!
//! let store = PgLifecycleStore::new(pool.clone());
//! let directory = PgDirectory::new(pool);
//! ```

pub mod mapping;
pub mod store;
pub mod directory;

pub use store::{PgLifecycleStore, PgUnitOfWork};
pub use directory::PgDirectory;
