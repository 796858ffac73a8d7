//! Shared fixtures and helpers for the lifecycle test suites
//!
//! Actors with fixed ids and roles, builders for requests, blocks and
//! expenses, invariant assertions, proptest strategies, and a disposable
//! PostgreSQL container for the store tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

pub mod assertions;
pub mod builders;
pub mod database;
pub mod fixtures;
pub mod generators;

pub use assertions::*;
pub use builders::*;
pub use database::{create_isolated_test_database, TestDatabase};
pub use fixtures::*;
pub use generators::*;
