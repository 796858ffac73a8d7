//! Disposable PostgreSQL for store tests
//!
//! Each [`TestDatabase`] owns its own container with the workspace schema
//! applied, so tests never share rows. Dropping it stops the container.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};

use domain_balance::UserBalance;
use domain_request::Actor;

const IMAGE: (&str, &str) = ("postgres", "16-alpine");
const USER: &str = "advance";
const PASSWORD: &str = "advance";
const DATABASE: &str = "expense_advance_test";
const SCHEMA: &str = include_str!("../../../migrations/0001_initial_schema.sql");

type TestResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Connection URL for a container published on `host:port`
pub fn connection_url(host: &str, port: u16) -> String {
    format!("postgres://{}:{}@{}:{}/{}", USER, PASSWORD, host, port, DATABASE)
}

/// A PostgreSQL container with the schema applied
pub struct TestDatabase {
    _container: ContainerAsync<GenericImage>,
    pool: PgPool,
}

impl TestDatabase {
    /// Starts the container and applies the schema
    ///
    /// # Errors
    ///
    /// Returns an error if Docker is unavailable or the schema fails to apply
    pub async fn start() -> TestResult<Self> {
        let container = GenericImage::new(IMAGE.0, IMAGE.1)
            .with_exposed_port(5432.tcp())
            .with_wait_for(WaitFor::message_on_stderr("database system is ready to accept connections"))
            .with_env_var("POSTGRES_USER", USER)
            .with_env_var("POSTGRES_PASSWORD", PASSWORD)
            .with_env_var("POSTGRES_DB", DATABASE)
            .start()
            .await?;

        let host = container.get_host().await?.to_string();
        let port = container.get_host_port_ipv4(5432.tcp()).await?;
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&connection_url(&host, port))
            .await?;

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;

        Ok(Self {
            _container: container,
            pool,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Inserts a profile row so the directory can resolve `actor`
    pub async fn insert_profile(&self, actor: &Actor) -> TestResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_profiles (user_id, display_name, email, metadata)
            VALUES ($1, $2, $3, jsonb_build_object('role', $4::text))
            "#,
        )
        .bind(*actor.id.as_uuid())
        .bind(&actor.display_name)
        .bind(&actor.email)
        .bind(actor.role.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Writes a ledger row directly, bypassing the services
    pub async fn seed_balance(&self, balance: &UserBalance) -> TestResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_balances (user_id, company, balance, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, company) DO UPDATE SET balance = EXCLUDED.balance
            "#,
        )
        .bind(*balance.user_id.as_uuid())
        .bind(balance.company.as_str())
        .bind(balance.balance.amount())
        .bind(balance.created_at)
        .bind(balance.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Starts a database owned by a single test
pub async fn create_isolated_test_database() -> TestResult<TestDatabase> {
    TestDatabase::start().await
}
