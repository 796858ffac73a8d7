//! Process-local implementations of the outbound ports
//!
//! Used by the server when no external channel is configured, and by tests.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use core_kernel::{DomainPort, PortError, UserId};
use domain_accounting::ClosingStatement;
use domain_request::Actor;

use crate::ports::{
    DeliveryReceipt, DocumentGenerator, DocumentStorage, GeneratedDocument, IdentityResolver,
    Notifier, Recipient,
};

/// Notifier that writes each message to the log
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

impl DomainPort for TracingNotifier {}

#[async_trait]
impl Notifier for TracingNotifier {
    async fn send(&self, recipient: &Recipient, message: &str) -> Result<DeliveryReceipt, PortError> {
        let id = Uuid::new_v4().to_string();
        info!(
            message_id = %id,
            recipient = %recipient.user_id,
            name = %recipient.display_name,
            %message,
            "Notification"
        );
        Ok(DeliveryReceipt {
            id,
            status: "logged".to_string(),
        })
    }
}

/// Fixed set of known users
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    actors: Arc<RwLock<HashMap<UserId, Actor>>>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, actor: Actor) {
        self.actors.write().await.insert(actor.id, actor);
    }

    pub async fn with_actors(actors: impl IntoIterator<Item = Actor>) -> Self {
        let directory = Self::new();
        for actor in actors {
            directory.insert(actor).await;
        }
        directory
    }
}

impl DomainPort for StaticDirectory {}

#[async_trait]
impl IdentityResolver for StaticDirectory {
    async fn resolve(&self, user_id: UserId) -> Result<Actor, PortError> {
        self.actors
            .read()
            .await
            .get(&user_id)
            .cloned()
            .ok_or_else(|| PortError::not_found("User", user_id))
    }
}

/// Keeps uploaded documents in memory under `{base_url}/{filename}`
#[derive(Debug, Clone)]
pub struct InMemoryDocumentStorage {
    base_url: String,
    files: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl InMemoryDocumentStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            files: Arc::default(),
        }
    }

    pub async fn get(&self, filename: &str) -> Option<Vec<u8>> {
        self.files.read().await.get(filename).cloned()
    }

    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.files.read().await.is_empty()
    }
}

impl Default for InMemoryDocumentStorage {
    fn default() -> Self {
        Self::new("memory://statements")
    }
}

impl DomainPort for InMemoryDocumentStorage {}

#[async_trait]
impl DocumentStorage for InMemoryDocumentStorage {
    async fn upload(&self, bytes: Vec<u8>, filename: &str, _content_type: &str) -> Result<String, PortError> {
        if filename.is_empty() {
            return Err(PortError::validation("filename is required"));
        }
        self.files.write().await.insert(filename.to_string(), bytes);
        Ok(format!("{}/{}", self.base_url, filename))
    }
}

/// Renders a closing statement as plain text
#[derive(Debug, Clone, Default)]
pub struct PlainTextStatementGenerator;

impl PlainTextStatementGenerator {
    pub fn render(statement: &ClosingStatement, company_name: &str, responsible_name: &str) -> String {
        let block = &statement.block;
        let mut out = String::new();
        let _ = writeln!(out, "Fechamento do bloco {}", block.code);
        let _ = writeln!(out, "Empresa: {}", company_name);
        let _ = writeln!(out, "Responsável: {}", responsible_name);
        if let Some(request) = &statement.request {
            let _ = writeln!(out, "Solicitação: {} ({})", request.id, request.request_type.as_str());
        }
        let _ = writeln!(out, "Valor inicial: {}", block.initial_amount);
        let _ = writeln!(out);
        for expense in &statement.expenses {
            let _ = writeln!(
                out,
                "{}  {:<14} {:<20} {:>14}  {}",
                expense.date.format("%d/%m/%Y"),
                expense.kind.label(),
                expense.category,
                expense.signed_effect(),
                expense.payment_method.label()
            );
        }
        let summary = &statement.summary;
        let _ = writeln!(out);
        let _ = writeln!(out, "Créditos: {}", summary.credits);
        let _ = writeln!(out, "Débitos: {}", summary.debits);
        let _ = writeln!(out, "Reembolsos: {}", summary.reimbursements);
        let _ = writeln!(out, "Saldo final: {}", statement.saldo_final());
        out
    }
}

impl DomainPort for PlainTextStatementGenerator {}

#[async_trait]
impl DocumentGenerator for PlainTextStatementGenerator {
    async fn generate(
        &self,
        statement: &ClosingStatement,
        company_name: &str,
        responsible_name: &str,
    ) -> Result<GeneratedDocument, PortError> {
        Ok(GeneratedDocument {
            bytes: Self::render(statement, company_name, responsible_name).into_bytes(),
            content_type: "text/plain; charset=utf-8".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_request::Role;

    #[tokio::test]
    async fn test_directory_resolves_known_users_only() {
        let known = Actor::new(UserId::new(), Role::Finance).with_name("Ana");
        let directory = StaticDirectory::with_actors([known.clone()]).await;

        assert_eq!(directory.resolve(known.id).await.unwrap(), known);
        assert!(directory.resolve(UserId::new()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_storage_returns_url_under_base() {
        let storage = InMemoryDocumentStorage::new("https://files.local/");
        let url = storage
            .upload(b"pdf".to_vec(), "fechamento-01-PRC-x.pdf", "application/pdf")
            .await
            .unwrap();

        assert_eq!(url, "https://files.local/fechamento-01-PRC-x.pdf");
        assert_eq!(storage.get("fechamento-01-PRC-x.pdf").await, Some(b"pdf".to_vec()));
    }
}
