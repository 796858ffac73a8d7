//! Expenses table

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

use crate::error::DatabaseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "expense_kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpenseKind {
    Credit,
    Debit,
    Reimbursement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "payment_method", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Pix,
    Cash,
    CreditCard,
    DebitCard,
    BankTransfer,
    Other,
}

/// Database row for an expense
#[derive(Debug, Clone, FromRow)]
pub struct ExpenseRow {
    pub expense_id: Uuid,
    pub block_id: Uuid,
    pub company: String,
    pub created_by: Uuid,
    pub amount: Decimal,
    pub category: String,
    pub payment_method: PaymentMethod,
    pub expense_date: NaiveDate,
    pub kind: ExpenseKind,
    pub description: Option<String>,
    pub image_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExpenseRepository;

impl ExpenseRepository {
    pub async fn find<'e, E: PgExecutor<'e>>(executor: E, expense_id: Uuid) -> Result<Option<ExpenseRow>, DatabaseError> {
        let row = sqlx::query_as::<_, ExpenseRow>("SELECT * FROM expenses WHERE expense_id = $1")
            .bind(expense_id)
            .fetch_optional(executor)
            .await?;
        Ok(row)
    }

    pub async fn lock<'e, E: PgExecutor<'e>>(executor: E, expense_id: Uuid) -> Result<Option<ExpenseRow>, DatabaseError> {
        let row = sqlx::query_as::<_, ExpenseRow>("SELECT * FROM expenses WHERE expense_id = $1 FOR UPDATE")
            .bind(expense_id)
            .fetch_optional(executor)
            .await?;
        Ok(row)
    }

    /// In statement order: by date, then by creation
    pub async fn for_block<'e, E: PgExecutor<'e>>(executor: E, block_id: Uuid) -> Result<Vec<ExpenseRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, ExpenseRow>(
            "SELECT * FROM expenses WHERE block_id = $1 ORDER BY expense_date, created_at",
        )
        .bind(block_id)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    pub async fn insert<'e, E: PgExecutor<'e>>(executor: E, row: &ExpenseRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO expenses (
                expense_id, block_id, company, created_by, amount, category,
                payment_method, expense_date, kind, description, image_urls,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(row.expense_id)
        .bind(row.block_id)
        .bind(&row.company)
        .bind(row.created_by)
        .bind(row.amount)
        .bind(&row.category)
        .bind(row.payment_method)
        .bind(row.expense_date)
        .bind(row.kind)
        .bind(&row.description)
        .bind(&row.image_urls)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn update<'e, E: PgExecutor<'e>>(executor: E, row: &ExpenseRow) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE expenses SET
                amount = $2,
                category = $3,
                payment_method = $4,
                expense_date = $5,
                kind = $6,
                description = $7,
                image_urls = $8,
                updated_at = $9
            WHERE expense_id = $1
            "#,
        )
        .bind(row.expense_id)
        .bind(row.amount)
        .bind(&row.category)
        .bind(row.payment_method)
        .bind(row.expense_date)
        .bind(row.kind)
        .bind(&row.description)
        .bind(&row.image_urls)
        .bind(row.updated_at)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Expense", row.expense_id));
        }
        Ok(())
    }

    pub async fn delete<'e, E: PgExecutor<'e>>(executor: E, expense_id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM expenses WHERE expense_id = $1")
            .bind(expense_id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Expense", expense_id));
        }
        Ok(())
    }

    pub async fn delete_for_block<'e, E: PgExecutor<'e>>(executor: E, block_id: Uuid) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM expenses WHERE block_id = $1")
            .bind(block_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
