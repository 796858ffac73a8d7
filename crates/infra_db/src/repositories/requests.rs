//! Requests table

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

use crate::error::DatabaseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "request_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Waiting,
    Validates,
    Authorizes,
    Accepts,
    Completed,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "request_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestType {
    Deposit,
    Reimbursement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "pix_key_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PixKeyType {
    Cpf,
    Cnpj,
    Email,
    Phone,
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "notification_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationStatus {
    Sent,
    Error,
}

/// Database row for a request
#[derive(Debug, Clone, FromRow)]
pub struct RequestRow {
    pub request_id: Uuid,
    pub request_type: RequestType,
    pub status: RequestStatus,
    pub amount: Decimal,
    pub current_balance: Decimal,
    pub initial_user_balance: Decimal,
    pub balance_deducted: Decimal,
    pub company: String,
    pub requester_id: Uuid,
    pub validator_id: Uuid,
    pub authorizer_id: Option<Uuid>,
    pub bank: Option<String>,
    pub agency: Option<String>,
    pub account: Option<String>,
    pub pix_key: Option<String>,
    pub pix_key_type: Option<PixKeyType>,
    pub description: Option<String>,
    pub denial_reason: Option<String>,
    pub proof_of_payment: Option<String>,
    pub notification_id: Option<String>,
    pub notification_status: Option<NotificationStatus>,
    pub notification_error: Option<String>,
    pub origin_block_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Optional filters for [`RequestRepository::list`]
#[derive(Debug, Clone, Default)]
pub struct RequestQuery {
    pub status: Option<RequestStatus>,
    pub request_type: Option<RequestType>,
    pub requester_id: Option<Uuid>,
    pub company: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// SQL for the requests table
///
/// Stateless: every function takes the executor to run on, so the same
/// statements serve plain pool reads and unit-of-work transactions.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestRepository;

impl RequestRepository {
    pub async fn find<'e, E: PgExecutor<'e>>(executor: E, request_id: Uuid) -> Result<Option<RequestRow>, DatabaseError> {
        let row = sqlx::query_as::<_, RequestRow>("SELECT * FROM requests WHERE request_id = $1")
            .bind(request_id)
            .fetch_optional(executor)
            .await?;
        Ok(row)
    }

    /// Reads the row and holds its lock until the transaction ends
    pub async fn lock<'e, E: PgExecutor<'e>>(executor: E, request_id: Uuid) -> Result<Option<RequestRow>, DatabaseError> {
        let row = sqlx::query_as::<_, RequestRow>("SELECT * FROM requests WHERE request_id = $1 FOR UPDATE")
            .bind(request_id)
            .fetch_optional(executor)
            .await?;
        Ok(row)
    }

    /// Newest first
    pub async fn list<'e, E: PgExecutor<'e>>(executor: E, query: &RequestQuery) -> Result<Vec<RequestRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, RequestRow>(
            r#"
            SELECT * FROM requests
            WHERE ($1::request_status IS NULL OR status = $1)
              AND ($2::request_type IS NULL OR request_type = $2)
              AND ($3::uuid IS NULL OR requester_id = $3)
              AND ($4::text IS NULL OR company = $4)
            ORDER BY created_at DESC
            LIMIT $5 OFFSET COALESCE($6, 0)
            "#,
        )
        .bind(query.status)
        .bind(query.request_type)
        .bind(query.requester_id)
        .bind(query.company.as_deref())
        .bind(query.limit)
        .bind(query.offset)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    pub async fn insert<'e, E: PgExecutor<'e>>(executor: E, row: &RequestRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO requests (
                request_id, request_type, status, amount, current_balance,
                initial_user_balance, balance_deducted, company, requester_id,
                validator_id, authorizer_id, bank, agency, account, pix_key,
                pix_key_type, description, denial_reason, proof_of_payment,
                notification_id, notification_status, notification_error,
                origin_block_id, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25
            )
            "#,
        )
        .bind(row.request_id)
        .bind(row.request_type)
        .bind(row.status)
        .bind(row.amount)
        .bind(row.current_balance)
        .bind(row.initial_user_balance)
        .bind(row.balance_deducted)
        .bind(&row.company)
        .bind(row.requester_id)
        .bind(row.validator_id)
        .bind(row.authorizer_id)
        .bind(&row.bank)
        .bind(&row.agency)
        .bind(&row.account)
        .bind(&row.pix_key)
        .bind(row.pix_key_type)
        .bind(&row.description)
        .bind(&row.denial_reason)
        .bind(&row.proof_of_payment)
        .bind(&row.notification_id)
        .bind(row.notification_status)
        .bind(&row.notification_error)
        .bind(row.origin_block_id)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Writes the mutable columns; amount, type and parties never change
    pub async fn update<'e, E: PgExecutor<'e>>(executor: E, row: &RequestRow) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE requests SET
                status = $2,
                current_balance = $3,
                balance_deducted = $4,
                authorizer_id = $5,
                denial_reason = $6,
                proof_of_payment = $7,
                notification_id = $8,
                notification_status = $9,
                notification_error = $10,
                updated_at = $11
            WHERE request_id = $1
            "#,
        )
        .bind(row.request_id)
        .bind(row.status)
        .bind(row.current_balance)
        .bind(row.balance_deducted)
        .bind(row.authorizer_id)
        .bind(&row.denial_reason)
        .bind(&row.proof_of_payment)
        .bind(&row.notification_id)
        .bind(row.notification_status)
        .bind(&row.notification_error)
        .bind(row.updated_at)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Request", row.request_id));
        }
        Ok(())
    }

    pub async fn delete<'e, E: PgExecutor<'e>>(executor: E, request_id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM requests WHERE request_id = $1")
            .bind(request_id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Request", request_id));
        }
        Ok(())
    }
}
