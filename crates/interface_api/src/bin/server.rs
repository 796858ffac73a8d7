//! Expense Advance API - Server Binary
//!
//! This binary starts the HTTP API server for the expense advance engine.
//!
//! # Usage
//!
//! ```bash
//! # Run with default configuration
//! cargo run --bin expense-advance-api
//!
//! # Run against the in-process store
//! API_STORE=memory API_LOG_FORMAT=json cargo run --bin expense-advance-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` - Server host (default: 0.0.0.0)
//! * `API_PORT` - Server port (default: 8080)
//! * `API_JWT_SECRET` - JWT signing secret (required in production)
//! * `API_DATABASE_URL` - PostgreSQL connection string
//! * `API_DB_MAX_CONNECTIONS`, `API_DB_ACQUIRE_TIMEOUT_SECS` - pool sizing
//! * `API_STORE` - `postgres` or `memory` (default: postgres)
//! * `API_LOG_LEVEL` - Log level: trace, debug, info, warn, error (default: info)
//! * `API_LOG_FORMAT` - `pretty` or `json` (default: pretty)
//! * `API_DOCUMENTS_DIR`, `API_PUBLIC_BASE_URL` - where statements are written and served
//! * `API_FONTS_DIR` - directory holding the Roboto font files
//! * `API_NOTIFIER_WEBHOOK_URL` - notification webhook; notifications are only logged when unset

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use domain_lifecycle::adapters::{
    InMemoryStore, PlainTextStatementGenerator, StaticDirectory, TracingNotifier,
};
use domain_lifecycle::{DocumentGenerator, IdentityResolver, LifecycleStore, Notifier, ServiceContext};
use domain_request::{Actor, Role};
use infra_db::{create_pool, run_migrations, PgDirectory, PgLifecycleStore};
use interface_api::adapters::{FsDocumentStorage, GenpdfStatementGenerator, WebhookNotifier};
use interface_api::auth::create_token;
use interface_api::config::{ApiConfig, LogFormat, StoreBackend};
use interface_api::{create_router, AppState};

/// Main entry point for the API server.
///
/// Initializes logging, loads configuration, wires the store and outbound
/// adapters, and starts the HTTP server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let (config, config_error) = match ApiConfig::from_env() {
        Ok(config) => (config, None),
        Err(e) => (ApiConfig::default(), Some(e)),
    };

    init_tracing(&config.log_level, config.log_format);
    if let Some(e) = config_error {
        warn!(error = %e, "Invalid API_* environment, using defaults");
    }

    info!(
        host = %config.host,
        port = %config.port,
        store = ?config.store,
        "Starting Expense Advance API Server"
    );

    let (store, identity) = build_store(&config).await?;
    let context = ServiceContext::new(
        store,
        build_notifier(&config)?,
        build_generator(&config),
        Arc::new(FsDocumentStorage::new(&config.documents_dir, &config.public_base_url)),
        identity,
    )
    .with_config(config.lifecycle());

    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .with_context(|| format!("invalid server address {}", config.server_addr()))?;
    let app = create_router(AppState::new(context, config));

    info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
fn init_tracing(log_level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer().with_target(true)).init(),
    }
}

async fn build_store(
    config: &ApiConfig,
) -> anyhow::Result<(Arc<dyn LifecycleStore>, Arc<dyn IdentityResolver>)> {
    match config.store {
        StoreBackend::Postgres => {
            let pool = create_pool(config.database())
                .await
                .context("connecting to the database")?;
            run_migrations(&pool).await.context("applying migrations")?;
            Ok((
                Arc::new(PgLifecycleStore::new(pool.clone())),
                Arc::new(PgDirectory::new(pool)),
            ))
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory store; all data is lost on shutdown");
            let admin = Actor::new(core_kernel::UserId::new(), Role::Admin).with_name("Administrador");
            let token = create_token(admin.id, &config.jwt_secret, config.jwt_expiration_secs)
                .context("issuing the development token")?;
            info!(user_id = %admin.id, %token, "Development admin token");
            let directory = StaticDirectory::with_actors([admin]).await;
            Ok((Arc::new(InMemoryStore::new()), Arc::new(directory)))
        }
    }
}

fn build_notifier(config: &ApiConfig) -> anyhow::Result<Arc<dyn Notifier>> {
    match &config.notifier_webhook_url {
        Some(url) => {
            let timeout = std::time::Duration::from_secs(config.notify_timeout_secs);
            Ok(Arc::new(WebhookNotifier::new(url.clone(), timeout)?))
        }
        None => {
            info!("No notification webhook configured; notifications are logged only");
            Ok(Arc::new(TracingNotifier))
        }
    }
}

fn build_generator(config: &ApiConfig) -> Arc<dyn DocumentGenerator> {
    match GenpdfStatementGenerator::from_dir(&config.fonts_dir) {
        Ok(generator) => Arc::new(generator),
        Err(e) => {
            warn!(error = %e, "PDF fonts unavailable; closing statements fall back to plain text");
            Arc::new(PlainTextStatementGenerator)
        }
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
