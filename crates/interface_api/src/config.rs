//! API configuration

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use core_kernel::RetryPolicy;
use domain_lifecycle::LifecycleConfig;
use infra_db::DatabaseConfig;

/// Which lifecycle store backs the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    /// Process-local store; data is lost on restart
    Memory,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Database URL
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// Log level
    pub log_level: String,
    pub log_format: LogFormat,
    pub store: StoreBackend,
    /// Where closing statements are written
    pub documents_dir: PathBuf,
    /// URL prefix under which `documents_dir` is served
    pub public_base_url: String,
    /// Directory holding the statement font family
    pub fonts_dir: PathBuf,
    /// Notifications go to this webhook; logged only when unset
    pub notifier_webhook_url: Option<String>,
    pub transaction_timeout_secs: u64,
    pub close_timeout_secs: u64,
    pub notify_timeout_secs: u64,
    pub retry_attempts: u32,
    pub cache_ttl_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            database_url: "postgres://localhost/expense_advance".to_string(),
            db_max_connections: 10,
            db_acquire_timeout_secs: 10,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            store: StoreBackend::Postgres,
            documents_dir: PathBuf::from("./statements"),
            public_base_url: "http://localhost:8080/statements".to_string(),
            fonts_dir: PathBuf::from("./fonts"),
            notifier_webhook_url: None,
            transaction_timeout_secs: 30,
            close_timeout_secs: 60,
            notify_timeout_secs: 10,
            retry_attempts: 3,
            cache_ttl_secs: 30,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from `API_*` environment variables
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("API"))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Pool settings for the PostgreSQL store
    pub fn database(&self) -> DatabaseConfig {
        DatabaseConfig::new(&self.database_url)
            .with_pool_size(self.db_max_connections)
            .with_acquire_timeout(Duration::from_secs(self.db_acquire_timeout_secs))
    }

    /// Timeouts, retries and cache lifetime for the lifecycle services
    pub fn lifecycle(&self) -> LifecycleConfig {
        let retry = RetryPolicy::new(self.retry_attempts.max(1), Duration::from_millis(100));
        LifecycleConfig::default()
            .with_retry(retry)
            .with_transaction_timeout(Duration::from_secs(self.transaction_timeout_secs))
            .with_close_timeout(Duration::from_secs(self.close_timeout_secs))
            .with_notify_timeout(Duration::from_secs(self.notify_timeout_secs))
            .with_cache_ttl(Duration::from_secs(self.cache_ttl_secs))
    }
}
