//! Accounting blocks table

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

use crate::error::DatabaseError;

/// Transaction-scoped advisory lock key serialising block code allocation
const BLOCK_CODE_LOCK: i64 = 0x5052_4300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "block_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockStatus {
    Open,
    Approved,
    Denied,
    Closed,
}

/// Database row for an accounting block
#[derive(Debug, Clone, FromRow)]
pub struct BlockRow {
    pub block_id: Uuid,
    pub code: String,
    pub status: BlockStatus,
    pub request_id: Option<Uuid>,
    pub responsible_id: Uuid,
    pub company: String,
    pub initial_amount: Decimal,
    pub current_balance: Decimal,
    pub saldo_final: Option<Decimal>,
    pub pdf_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct BlockQuery {
    pub status: Option<BlockStatus>,
    pub company: Option<String>,
    pub responsible_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BlockRepository;

impl BlockRepository {
    pub async fn find<'e, E: PgExecutor<'e>>(executor: E, block_id: Uuid) -> Result<Option<BlockRow>, DatabaseError> {
        let row = sqlx::query_as::<_, BlockRow>("SELECT * FROM accounting_blocks WHERE block_id = $1")
            .bind(block_id)
            .fetch_optional(executor)
            .await?;
        Ok(row)
    }

    pub async fn lock<'e, E: PgExecutor<'e>>(executor: E, block_id: Uuid) -> Result<Option<BlockRow>, DatabaseError> {
        let row = sqlx::query_as::<_, BlockRow>(
            "SELECT * FROM accounting_blocks WHERE block_id = $1 FOR UPDATE",
        )
        .bind(block_id)
        .fetch_optional(executor)
        .await?;
        Ok(row)
    }

    pub async fn find_by_request<'e, E: PgExecutor<'e>>(
        executor: E,
        request_id: Uuid,
    ) -> Result<Option<BlockRow>, DatabaseError> {
        let row = sqlx::query_as::<_, BlockRow>("SELECT * FROM accounting_blocks WHERE request_id = $1")
            .bind(request_id)
            .fetch_optional(executor)
            .await?;
        Ok(row)
    }

    pub async fn lock_by_request<'e, E: PgExecutor<'e>>(
        executor: E,
        request_id: Uuid,
    ) -> Result<Option<BlockRow>, DatabaseError> {
        let row = sqlx::query_as::<_, BlockRow>(
            "SELECT * FROM accounting_blocks WHERE request_id = $1 FOR UPDATE",
        )
        .bind(request_id)
        .fetch_optional(executor)
        .await?;
        Ok(row)
    }

    /// Takes the code allocation lock for the rest of the transaction
    pub async fn lock_code_sequence<'e, E: PgExecutor<'e>>(executor: E) -> Result<(), DatabaseError> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(BLOCK_CODE_LOCK)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Code of the most recently created block
    pub async fn latest_code<'e, E: PgExecutor<'e>>(executor: E) -> Result<Option<String>, DatabaseError> {
        let code = sqlx::query_scalar::<_, String>(
            r#"
            SELECT code FROM accounting_blocks
            ORDER BY created_at DESC, length(code) DESC, code DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(executor)
        .await?;
        Ok(code)
    }

    /// Highest sequence first
    pub async fn list<'e, E: PgExecutor<'e>>(executor: E, query: &BlockQuery) -> Result<Vec<BlockRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, BlockRow>(
            r#"
            SELECT * FROM accounting_blocks
            WHERE ($1::block_status IS NULL OR status = $1)
              AND ($2::text IS NULL OR company = $2)
              AND ($3::uuid IS NULL OR responsible_id = $3)
            ORDER BY created_at DESC, length(code) DESC, code DESC
            LIMIT $4 OFFSET COALESCE($5, 0)
            "#,
        )
        .bind(query.status)
        .bind(query.company.as_deref())
        .bind(query.responsible_id)
        .bind(query.limit)
        .bind(query.offset)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    pub async fn insert<'e, E: PgExecutor<'e>>(executor: E, row: &BlockRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO accounting_blocks (
                block_id, code, status, request_id, responsible_id, company,
                initial_amount, current_balance, saldo_final, pdf_url,
                created_at, updated_at, closed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(row.block_id)
        .bind(&row.code)
        .bind(row.status)
        .bind(row.request_id)
        .bind(row.responsible_id)
        .bind(&row.company)
        .bind(row.initial_amount)
        .bind(row.current_balance)
        .bind(row.saldo_final)
        .bind(&row.pdf_url)
        .bind(row.created_at)
        .bind(row.updated_at)
        .bind(row.closed_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn update<'e, E: PgExecutor<'e>>(executor: E, row: &BlockRow) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE accounting_blocks SET
                status = $2,
                request_id = $3,
                current_balance = $4,
                saldo_final = $5,
                pdf_url = $6,
                updated_at = $7,
                closed_at = $8
            WHERE block_id = $1
            "#,
        )
        .bind(row.block_id)
        .bind(row.status)
        .bind(row.request_id)
        .bind(row.current_balance)
        .bind(row.saldo_final)
        .bind(&row.pdf_url)
        .bind(row.updated_at)
        .bind(row.closed_at)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("AccountingBlock", row.block_id));
        }
        Ok(())
    }
}
