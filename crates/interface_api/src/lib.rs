//! HTTP API Layer
//!
//! This crate provides the REST API for the expense advance engine using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: Request handlers for requests, blocks, expenses and balances
//! - **Middleware**: Authentication, tracing, request ids, audit logging
//! - **DTOs**: Request/Response data transfer objects
//! - **Adapters**: PDF statements, filesystem storage, webhook notifications
//! - **Error Handling**: Consistent error responses
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let app = create_router(AppState::new(context, config));
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;
pub mod auth;
pub mod adapters;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware as axum_middleware,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use domain_lifecycle::{IdentityResolver, LifecycleStore, ServiceContext, Services};

use crate::config::ApiConfig;
use crate::handlers::{balances, blocks, expenses, health, requests};
use crate::middleware::{audit_middleware, auth_middleware};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub store: Arc<dyn LifecycleStore>,
    pub identity: Arc<dyn IdentityResolver>,
    pub config: ApiConfig,
}

impl AppState {
    /// Wires the lifecycle services from `context`
    pub fn new(context: ServiceContext, config: ApiConfig) -> Self {
        let store = context.store.clone();
        let identity = context.identity.clone();
        Self {
            services: Services::new(context),
            store,
            identity,
            config,
        }
    }
}

/// Creates the main API router
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let request_routes = Router::new()
        .route("/", post(requests::create_request).get(requests::list_requests))
        .route("/:id", get(requests::get_request))
        .route("/:id/validate", post(requests::validate_request))
        .route("/:id/authorize", post(requests::authorize_request))
        .route("/:id/accept", post(requests::accept_request))
        .route("/:id/complete", post(requests::complete_request))
        .route("/:id/deny", post(requests::deny_request));

    let block_routes = Router::new()
        .route("/", get(blocks::list_blocks))
        .route("/:id", get(blocks::get_block))
        .route("/:id/expenses", get(expenses::list_expenses).post(expenses::register_expense))
        .route("/:id/close", post(blocks::close_block))
        .route("/:id/reimbursement", post(blocks::initiate_reimbursement));

    let expense_routes = Router::new().route(
        "/:id",
        get(expenses::get_expense)
            .put(expenses::edit_expense)
            .delete(expenses::delete_expense),
    );

    let balance_routes = Router::new().route("/:company", get(balances::get_balance));

    // Protected API routes
    let api_routes = Router::new()
        .nest("/requests", request_routes)
        .nest("/blocks", block_routes)
        .nest("/expenses", expense_routes)
        .nest("/balances", balance_routes)
        .layer(axum_middleware::from_fn_with_state(state.clone(), audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Combine all routes
    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
