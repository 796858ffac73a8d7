//! Expense handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{BlockId, ExpenseId};

use crate::auth::CurrentActor;
use crate::dto::blocks::{ExpenseBody, ExpenseResponse, UpdateExpenseBody};
use crate::{error::ApiError, AppState};

/// Lists the expenses of a block
pub async fn list_expenses(
    State(state): State<AppState>,
    CurrentActor(_actor): CurrentActor,
    Path(block_id): Path<Uuid>,
) -> Result<Json<Vec<ExpenseResponse>>, ApiError> {
    let expenses = state
        .services
        .expenses
        .list_expenses(BlockId::from_uuid(block_id))
        .await?;
    Ok(Json(expenses.into_iter().map(Into::into).collect()))
}

/// Registers an expense against a block
pub async fn register_expense(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(block_id): Path<Uuid>,
    Json(body): Json<ExpenseBody>,
) -> Result<(StatusCode, Json<ExpenseResponse>), ApiError> {
    body.validate()?;
    let expense = state
        .services
        .expenses
        .register_expense(BlockId::from_uuid(block_id), &actor, body.into())
        .await?;
    Ok((StatusCode::CREATED, Json(expense.into())))
}

/// Gets an expense by ID
pub async fn get_expense(
    State(state): State<AppState>,
    CurrentActor(_actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<ExpenseResponse>, ApiError> {
    let expense = state.services.expenses.get_expense(ExpenseId::from_uuid(id)).await?;
    Ok(Json(expense.into()))
}

/// Edits an expense; only its creator may
pub async fn edit_expense(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateExpenseBody>,
) -> Result<Json<ExpenseResponse>, ApiError> {
    body.validate()?;
    let expense = state
        .services
        .expenses
        .edit_expense(ExpenseId::from_uuid(id), &actor, body.into())
        .await?;
    Ok(Json(expense.into()))
}

/// Deletes an expense; only its creator may
pub async fn delete_expense(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .services
        .expenses
        .delete_expense(ExpenseId::from_uuid(id), &actor)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
