//! HTTP API tests over the in-memory store

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

use domain_lifecycle::adapters::{
    InMemoryDocumentStorage, InMemoryStore, PlainTextStatementGenerator, StaticDirectory, TracingNotifier,
};
use domain_lifecycle::ServiceContext;
use domain_request::Actor;
use interface_api::auth::create_token;
use interface_api::config::ApiConfig;
use interface_api::{create_router, AppState};
use test_utils::{ActorFixtures, StringFixtures};

struct TestApp {
    router: Router,
    secret: String,
}

impl TestApp {
    async fn new() -> Self {
        let directory = StaticDirectory::with_actors(ActorFixtures::all()).await;
        let context = ServiceContext::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(TracingNotifier),
            Arc::new(PlainTextStatementGenerator),
            Arc::new(InMemoryDocumentStorage::new("https://files.test/statements")),
            Arc::new(directory),
        );
        let config = ApiConfig {
            jwt_secret: "test-secret".to_string(),
            ..Default::default()
        };
        let secret = config.jwt_secret.clone();

        Self {
            router: create_router(AppState::new(context, config)),
            secret,
        }
    }

    async fn call(&self, actor: &Actor, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let token = create_token(actor.id, &self.secret, 3600).unwrap();
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token));
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create_request(&self, amount: Decimal) -> String {
        let (status, body) = self
            .call(
                &ActorFixtures::requester(),
                Method::POST,
                "/api/v1/requests",
                Some(json!({
                    "amount": amount,
                    "company": StringFixtures::company().as_str(),
                    "validator_id": ActorFixtures::validator().id,
                    "pix_key": "joao@example.com",
                    "pix_key_type": "EMAIL",
                    "description": "Visita ao cliente"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_str().unwrap().to_string()
    }

    /// Walks a new request to ACCEPTS and returns the opened block id
    async fn accepted_block(&self, amount: Decimal) -> String {
        let id = self.create_request(amount).await;
        let (status, _) = self
            .call(
                &ActorFixtures::validator(),
                Method::POST,
                &format!("/api/v1/requests/{}/validate", id),
                Some(json!({ "authorizer_id": ActorFixtures::authorizer().id })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = self
            .call(
                &ActorFixtures::authorizer(),
                Method::POST,
                &format!("/api/v1/requests/{}/authorize", id),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = self
            .call(
                &ActorFixtures::finance(),
                Method::POST,
                &format!("/api/v1/requests/{}/accept", id),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["block"]["id"].as_str().unwrap().to_string()
    }

    async fn add_expense(&self, block_id: &str, amount: Decimal, kind: &str) -> (StatusCode, Value) {
        self.call(
            &ActorFixtures::requester(),
            Method::POST,
            &format!("/api/v1/blocks/{}/expenses", block_id),
            Some(json!({
                "amount": amount,
                "category": "Transporte",
                "payment_method": "PIX",
                "date": "2024-05-10",
                "kind": kind
            })),
        )
        .await
    }
}

fn decimal(value: &Value) -> Decimal {
    serde_json::from_value(value.clone()).unwrap()
}

#[tokio::test]
async fn test_create_request_starts_waiting() {
    let app = TestApp::new().await;
    let id = app.create_request(dec!(250)).await;

    let (status, body) = app
        .call(&ActorFixtures::requester(), Method::GET, &format!("/api/v1/requests/{}", id), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "WAITING");
    assert_eq!(body["request_type"], "DEPOSIT");
    assert_eq!(decimal(&body["amount"]), dec!(250));
    assert_eq!(body["notification"]["status"], "SENT");
}

#[tokio::test]
async fn test_invalid_body_is_unprocessable() {
    let app = TestApp::new().await;

    let (status, body) = app
        .call(
            &ActorFixtures::requester(),
            Method::POST,
            "/api/v1/requests",
            Some(json!({
                "amount": "-5",
                "company": "",
                "validator_id": ActorFixtures::validator().id
            })),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["details"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_unknown_user_is_forbidden() {
    let app = TestApp::new().await;
    let stranger = Actor::new(core_kernel::UserId::new(), domain_request::Role::Admin);

    let (status, _) = app.call(&stranger, Method::GET, "/api/v1/requests", None).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_wrong_validator_gets_forbidden() {
    let app = TestApp::new().await;
    let id = app.create_request(dec!(100)).await;

    let (status, body) = app
        .call(
            &ActorFixtures::authorizer(),
            Method::POST,
            &format!("/api/v1/requests/{}/validate", id),
            Some(json!({ "authorizer_id": ActorFixtures::authorizer().id })),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN, "{}", body);
}

#[tokio::test]
async fn test_skipping_a_step_is_a_conflict() {
    let app = TestApp::new().await;
    let id = app.create_request(dec!(100)).await;

    let (status, body) = app
        .call(
            &ActorFixtures::finance(),
            Method::POST,
            &format!("/api/v1/requests/{}/accept", id),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_transition");
}

#[tokio::test]
async fn test_accept_opens_block_and_expense_moves_balances() {
    let app = TestApp::new().await;
    let block_id = app.accepted_block(dec!(100)).await;

    let (status, expense) = app.add_expense(&block_id, dec!(30), "DEBIT").await;
    assert_eq!(status, StatusCode::CREATED, "{}", expense);
    assert_eq!(decimal(&expense["signed_amount"]), dec!(-30));

    let (status, block) = app
        .call(&ActorFixtures::requester(), Method::GET, &format!("/api/v1/blocks/{}", block_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(block["code"], "01-PRC");
    assert_eq!(decimal(&block["initial_amount"]), dec!(100));
    assert_eq!(decimal(&block["current_balance"]), dec!(70));
    assert_eq!(decimal(&block["summary"]["saldo"]), dec!(-30));

    let (status, balance) = app
        .call(
            &ActorFixtures::requester(),
            Method::GET,
            &format!("/api/v1/balances/{}", StringFixtures::company().as_str().replace(' ', "%20")),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&balance["balance"]), dec!(-30));
}

#[tokio::test]
async fn test_negative_block_close_awaits_reimbursement() {
    let app = TestApp::new().await;
    let block_id = app.accepted_block(dec!(100)).await;
    app.add_expense(&block_id, dec!(150), "DEBIT").await;

    let (status, body) = app
        .call(
            &ActorFixtures::requester(),
            Method::POST,
            &format!("/api/v1/blocks/{}/close", block_id),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "awaiting_reimbursement");
    assert_eq!(body["message"], "Bloco com saldo negativo. Adicione um reembolso para poder fechar.");
    assert_eq!(decimal(&body["saldo"]), dec!(-150));
}

#[tokio::test]
async fn test_reimbursement_then_close_succeeds() {
    let app = TestApp::new().await;
    let block_id = app.accepted_block(dec!(100)).await;
    app.add_expense(&block_id, dec!(150), "DEBIT").await;

    let (status, body) = app
        .call(
            &ActorFixtures::requester(),
            Method::POST,
            &format!("/api/v1/blocks/{}/reimbursement", block_id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["request"]["request_type"], "REIMBURSEMENT");
    assert_eq!(body["request"]["status"], "AUTHORIZES");
    assert_eq!(decimal(&body["request"]["amount"]), dec!(150));
    assert_eq!(body["block"]["status"], "APPROVED");

    let (status, again) = app
        .call(
            &ActorFixtures::requester(),
            Method::POST,
            &format!("/api/v1/blocks/{}/reimbursement", block_id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{}", again);

    let (status, _) = app.add_expense(&block_id, dec!(50), "REIMBURSEMENT").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, closed) = app
        .call(
            &ActorFixtures::finance(),
            Method::POST,
            &format!("/api/v1/blocks/{}/close", block_id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", closed);
    assert_eq!(closed["outcome"], "closed");
    assert_eq!(decimal(&closed["saldo_final"]), dec!(0));
    assert!(closed["pdf_url"].as_str().unwrap().starts_with("https://files.test/statements/fechamento-01-PRC-"));
    assert_eq!(closed["block"]["status"], "CLOSED");

    let (status, body) = app.add_expense(&block_id, dec!(10), "DEBIT").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "terminal_state");
}

#[tokio::test]
async fn test_only_creator_may_delete_expense() {
    let app = TestApp::new().await;
    let block_id = app.accepted_block(dec!(100)).await;
    let (_, expense) = app.add_expense(&block_id, dec!(20), "DEBIT").await;
    let uri = format!("/api/v1/expenses/{}", expense["id"].as_str().unwrap());

    let (status, _) = app.call(&ActorFixtures::validator(), Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.call(&ActorFixtures::requester(), Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.call(&ActorFixtures::requester(), Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_plain_user_cannot_read_another_balance() {
    let app = TestApp::new().await;
    let uri = format!(
        "/api/v1/balances/Acme?user_id={}",
        ActorFixtures::requester().id.as_uuid()
    );

    let (status, _) = app.call(&ActorFixtures::validator(), Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.call(&ActorFixtures::finance(), Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["balance"]), dec!(0));
}

#[tokio::test]
async fn test_readiness_reports_store_health() {
    let app = TestApp::new().await;

    let (status, body) = app
        .call(&ActorFixtures::requester(), Method::GET, "/health/ready", None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["store"]["adapter_id"], "memory-store");
    assert_eq!(body["store"]["status"], "healthy");
}

#[tokio::test]
async fn test_malformed_bearer_is_rejected_with_json_body() {
    let app = TestApp::new().await;
    let request = Request::builder()
        .uri("/api/v1/requests")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}
