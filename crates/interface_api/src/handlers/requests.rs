//! Request handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{RequestId, UserId};
use domain_lifecycle::RequestFilter;
use domain_request::{Actor, Transition};

use crate::auth::CurrentActor;
use crate::dto::requests::*;
use crate::{error::ApiError, AppState};

/// Creates a new DEPOSIT request for the caller
pub async fn create_request(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(body): Json<CreateRequestBody>,
) -> Result<(StatusCode, Json<RequestResponse>), ApiError> {
    body.validate()?;
    let request = state.services.requests.create_request(&actor, body.into()).await?;
    Ok((StatusCode::CREATED, Json(request.into())))
}

/// Lists requests
pub async fn list_requests(
    State(state): State<AppState>,
    CurrentActor(_actor): CurrentActor,
    Query(query): Query<ListRequestsQuery>,
) -> Result<Json<Vec<RequestResponse>>, ApiError> {
    let filter = RequestFilter::from(query);
    let requests = state.services.requests.list_requests(&filter).await?;
    Ok(Json(requests.into_iter().map(Into::into).collect()))
}

/// Gets a request by ID
pub async fn get_request(
    State(state): State<AppState>,
    CurrentActor(_actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<RequestResponse>, ApiError> {
    let request = state.services.requests.get_request(RequestId::from_uuid(id)).await?;
    Ok(Json(request.into()))
}

async fn apply(
    state: &AppState,
    id: Uuid,
    actor: &Actor,
    transition: Transition,
) -> Result<Json<TransitionResponse>, ApiError> {
    let result = state
        .services
        .requests
        .transition(RequestId::from_uuid(id), actor, transition)
        .await?;
    Ok(Json(result.into()))
}

/// WAITING -> VALIDATES
pub async fn validate_request(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(body): Json<ValidateRequestBody>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let transition = Transition::Validate {
        authorizer_id: UserId::from_uuid(body.authorizer_id),
    };
    apply(&state, id, &actor, transition).await
}

/// VALIDATES -> AUTHORIZES
pub async fn authorize_request(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<TransitionResponse>, ApiError> {
    apply(&state, id, &actor, Transition::Authorize).await
}

/// AUTHORIZES -> ACCEPTS
pub async fn accept_request(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<TransitionResponse>, ApiError> {
    apply(&state, id, &actor, Transition::Accept).await
}

/// ACCEPTS -> COMPLETED
pub async fn complete_request(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(body): Json<CompleteRequestBody>,
) -> Result<Json<TransitionResponse>, ApiError> {
    body.validate()?;
    let transition = Transition::Complete {
        proof_of_payment: body.proof_of_payment,
    };
    apply(&state, id, &actor, transition).await
}

/// Any non-terminal status -> DENIED
pub async fn deny_request(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    Json(body): Json<DenyRequestBody>,
) -> Result<Json<TransitionResponse>, ApiError> {
    body.validate()?;
    apply(&state, id, &actor, Transition::Deny { reason: body.reason }).await
}
