//! User balance ledger table

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

use crate::error::DatabaseError;

/// Database row for one (user, company) ledger entry
#[derive(Debug, Clone, FromRow)]
pub struct BalanceRow {
    pub user_id: Uuid,
    pub company: String,
    pub balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BalanceRepository;

impl BalanceRepository {
    pub async fn find<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: Uuid,
        company: &str,
    ) -> Result<Option<BalanceRow>, DatabaseError> {
        let row = sqlx::query_as::<_, BalanceRow>(
            "SELECT * FROM user_balances WHERE user_id = $1 AND company = $2",
        )
        .bind(user_id)
        .bind(company)
        .fetch_optional(executor)
        .await?;
        Ok(row)
    }

    /// Inserts a zero row unless one exists; concurrent callers converge on
    /// the same row
    pub async fn ensure<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: Uuid,
        company: &str,
        now: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO user_balances (user_id, company, balance, created_at, updated_at)
            VALUES ($1, $2, 0, $3, $3)
            ON CONFLICT (user_id, company) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(company)
        .bind(now)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn lock<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: Uuid,
        company: &str,
    ) -> Result<BalanceRow, DatabaseError> {
        sqlx::query_as::<_, BalanceRow>(
            "SELECT * FROM user_balances WHERE user_id = $1 AND company = $2 FOR UPDATE",
        )
        .bind(user_id)
        .bind(company)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| DatabaseError::not_found("UserBalance", format!("{}/{}", user_id, company)))
    }

    pub async fn save<'e, E: PgExecutor<'e>>(executor: E, row: &BalanceRow) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE user_balances SET balance = $3, updated_at = $4 WHERE user_id = $1 AND company = $2",
        )
        .bind(row.user_id)
        .bind(&row.company)
        .bind(row.balance)
        .bind(row.updated_at)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(
                "UserBalance",
                format!("{}/{}", row.user_id, row.company),
            ));
        }
        Ok(())
    }
}
