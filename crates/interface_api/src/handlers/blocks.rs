//! Accounting block handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use core_kernel::BlockId;
use domain_lifecycle::BlockFilter;

use crate::auth::CurrentActor;
use crate::dto::blocks::*;
use crate::{error::ApiError, AppState};

/// Lists accounting blocks
pub async fn list_blocks(
    State(state): State<AppState>,
    CurrentActor(_actor): CurrentActor,
    Query(query): Query<ListBlocksQuery>,
) -> Result<Json<Vec<BlockResponse>>, ApiError> {
    let filter = BlockFilter::from(query);
    let blocks = state.services.blocks.list_blocks(&filter).await?;
    Ok(Json(blocks.into_iter().map(Into::into).collect()))
}

/// Gets a block with the totals of its expenses
pub async fn get_block(
    State(state): State<AppState>,
    CurrentActor(_actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<BlockResponse>, ApiError> {
    let details = state.services.blocks.get_block(BlockId::from_uuid(id)).await?;
    Ok(Json(details.into()))
}

/// Closes a block
///
/// Responds 200 with an `outcome` of `closed` or `awaiting_reimbursement`.
/// A negative block without a reimbursement is a normal result, not an
/// error.
pub async fn close_block(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<CloseResponse>, ApiError> {
    let outcome = state.services.blocks.close_block(BlockId::from_uuid(id), &actor).await?;
    Ok(Json(outcome.into()))
}

/// Creates the reimbursement request of a negative block
pub async fn initiate_reimbursement(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<ReimbursementResponse>), ApiError> {
    let result = state
        .services
        .reimbursements
        .initiate_reimbursement(BlockId::from_uuid(id), &actor)
        .await?;
    Ok((StatusCode::CREATED, Json(result.into())))
}
