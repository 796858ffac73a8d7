//! In-process adapters for the lifecycle ports

pub mod memory;
pub mod local;

pub use memory::{InMemoryStore, MemoryState, MemoryUnitOfWork};
pub use local::{InMemoryDocumentStorage, PlainTextStatementGenerator, StaticDirectory, TracingNotifier};
