//! Balance handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};

use core_kernel::{Company, UserId};

use crate::auth::CurrentActor;
use crate::dto::balances::{BalanceQuery, BalanceResponse};
use crate::{error::ApiError, AppState};

/// Gets the caller's ledger balance for a company
///
/// FINANCE and ADMIN may read another user's balance with `?user_id=`.
pub async fn get_balance(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(company): Path<String>,
    Query(query): Query<BalanceQuery>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let user_id = match query.user_id.map(UserId::from_uuid) {
        Some(other) if other != actor.id && !actor.role.can_disburse() => {
            return Err(ApiError::Forbidden(format!(
                "user {} may not read the balance of {}",
                actor.id, other
            )));
        }
        Some(other) => other,
        None => actor.id,
    };

    let balance = state
        .services
        .balances
        .get_balance(user_id, Company::new(company))
        .await?;
    Ok(Json(balance.into()))
}
