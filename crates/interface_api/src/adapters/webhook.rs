//! Webhook notification channel

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use core_kernel::{DomainPort, PortError, UserId};
use domain_lifecycle::{DeliveryReceipt, Notifier, Recipient};

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    id: String,
    user_id: UserId,
    name: &'a str,
    email: Option<&'a str>,
    message: &'a str,
}

#[derive(Debug, Deserialize)]
struct WebhookAck {
    id: Option<String>,
    status: Option<String>,
}

/// POSTs each notification as JSON to a fixed URL
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    url: String,
    http: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, PortError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PortError::internal(format!("cannot build webhook client: {}", e)))?;
        Ok(Self { url: url.into(), http })
    }
}

fn classify(error: reqwest::Error) -> PortError {
    if error.is_timeout() {
        PortError::Timeout {
            operation: "webhook notification".to_string(),
            duration_ms: 0,
        }
    } else if error.is_connect() || error.is_request() {
        PortError::connection(error.to_string())
    } else {
        PortError::internal(error.to_string())
    }
}

impl DomainPort for WebhookNotifier {}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, recipient: &Recipient, message: &str) -> Result<DeliveryReceipt, PortError> {
        let payload = WebhookPayload {
            id: Uuid::new_v4().to_string(),
            user_id: recipient.user_id,
            name: &recipient.display_name,
            email: recipient.email.as_deref(),
            message,
        };

        let res = self.http.post(&self.url).json(&payload).send().await.map_err(classify)?;

        let status = res.status();
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(PortError::ServiceUnavailable {
                service: format!("notification webhook ({})", status),
            });
        }
        if !status.is_success() {
            return Err(PortError::internal(format!("notification webhook rejected message: {}", status)));
        }

        // Acknowledgement bodies are optional
        let ack = res.json::<WebhookAck>().await.ok();
        let receipt = DeliveryReceipt {
            id: ack.as_ref().and_then(|a| a.id.clone()).unwrap_or(payload.id),
            status: ack.and_then(|a| a.status).unwrap_or_else(|| "sent".to_string()),
        };
        debug!(recipient = %recipient.user_id, message_id = %receipt.id, "Webhook accepted notification");
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_webhook_is_a_transient_failure() {
        let notifier = WebhookNotifier::new("http://127.0.0.1:9/notify", Duration::from_secs(2)).unwrap();
        let recipient = Recipient {
            user_id: UserId::new(),
            display_name: "Ana".to_string(),
            email: None,
        };

        let error = notifier.send(&recipient, "olá").await.unwrap_err();

        assert!(error.is_transient());
    }
}
