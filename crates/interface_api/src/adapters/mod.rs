//! Outbound adapters wired by the server binary
//!
//! - [`GenpdfStatementGenerator`]: closing statement PDFs
//! - [`FsDocumentStorage`]: statements written under a served directory
//! - [`WebhookNotifier`]: notifications POSTed as JSON

pub mod statement;
pub mod storage;
pub mod webhook;

pub use statement::GenpdfStatementGenerator;
pub use storage::FsDocumentStorage;
pub use webhook::WebhookNotifier;
