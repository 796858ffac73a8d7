//! HTTP handlers

pub mod health;
pub mod requests;
pub mod blocks;
pub mod expenses;
pub mod balances;
