//! Request DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::{Company, Money, UserId};
use domain_lifecycle::{CreateRequest, RequestFilter, TransitionResult};
use domain_request::{
    NotificationStatus, PayoutDetails, PixKeyType, Request, RequestStatus, RequestType,
};

use super::blocks::BlockResponse;
use super::positive_amount;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRequestBody {
    #[validate(custom(function = "positive_amount"))]
    pub amount: Decimal,
    #[validate(length(min = 1, max = 120, message = "company is required"))]
    pub company: String,
    pub validator_id: Uuid,
    pub pix_key: Option<String>,
    pub pix_key_type: Option<PixKeyType>,
    pub bank: Option<String>,
    pub agency: Option<String>,
    pub account: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

impl From<CreateRequestBody> for CreateRequest {
    fn from(body: CreateRequestBody) -> Self {
        CreateRequest {
            amount: Money::new(body.amount),
            company: Company::new(body.company),
            validator_id: UserId::from_uuid(body.validator_id),
            payout: PayoutDetails {
                bank: body.bank,
                agency: body.agency,
                account: body.account,
                pix_key: body.pix_key,
                pix_key_type: body.pix_key_type,
            },
            description: body.description,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ValidateRequestBody {
    pub authorizer_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CompleteRequestBody {
    #[validate(length(min = 1, max = 2048, message = "a proof of payment is required"))]
    pub proof_of_payment: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DenyRequestBody {
    #[validate(length(min = 1, max = 1000, message = "a denial reason is required"))]
    pub reason: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListRequestsQuery {
    pub status: Option<RequestStatus>,
    pub request_type: Option<RequestType>,
    pub requester_id: Option<Uuid>,
    pub company: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl From<ListRequestsQuery> for RequestFilter {
    fn from(query: ListRequestsQuery) -> Self {
        RequestFilter {
            status: query.status,
            request_type: query.request_type,
            requester_id: query.requester_id.map(UserId::from_uuid),
            company: query.company.map(Company::new),
            limit: query.limit,
            offset: query.offset,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub status: NotificationStatus,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RequestResponse {
    pub id: Uuid,
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
    pub payout: PayoutDetails,
    pub description: Option<String>,
    pub denial_reason: Option<String>,
    pub proof_of_payment: Option<String>,
    pub notification: Option<NotificationResponse>,
    pub origin_block_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Request> for RequestResponse {
    fn from(request: Request) -> Self {
        Self {
            id: *request.id.as_uuid(),
            request_type: request.request_type,
            status: request.status,
            amount: request.amount.amount(),
            current_balance: request.current_balance.amount(),
            initial_user_balance: request.initial_user_balance.amount(),
            balance_deducted: request.balance_deducted.amount(),
            company: request.company.as_str().to_string(),
            requester_id: *request.requester_id.as_uuid(),
            validator_id: *request.validator_id.as_uuid(),
            authorizer_id: request.authorizer_id.map(Into::into),
            payout: request.payout,
            description: request.description,
            denial_reason: request.denial_reason,
            proof_of_payment: request.proof_of_payment,
            notification: request.notification.map(|n| NotificationResponse {
                status: n.status,
                message_id: n.message_id,
                error: n.error,
            }),
            origin_block_id: request.origin_block.map(Into::into),
            created_at: request.created_at,
            updated_at: request.updated_at,
        }
    }
}

/// Result of a status change
#[derive(Debug, Serialize)]
pub struct TransitionResponse {
    pub from: RequestStatus,
    pub to: RequestStatus,
    /// Amount drawn from the requester's ledger by this transition
    pub deducted: Decimal,
    pub request: RequestResponse,
    /// Block opened by this transition
    pub block: Option<BlockResponse>,
}

impl From<TransitionResult> for TransitionResponse {
    fn from(result: TransitionResult) -> Self {
        Self {
            from: result.outcome.from,
            to: result.outcome.to,
            deducted: result.deducted.amount(),
            request: result.request.into(),
            block: result.block.map(BlockResponse::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_create_body_rejects_non_positive_amount() {
        let body = CreateRequestBody {
            amount: dec!(0),
            company: "Acme".to_string(),
            validator_id: Uuid::new_v4(),
            pix_key: Some("a@b.c".to_string()),
            pix_key_type: Some(PixKeyType::Email),
            bank: None,
            agency: None,
            account: None,
            description: None,
        };

        let errors = body.validate().unwrap_err();

        assert!(errors.field_errors().contains_key("amount"));
    }

    #[test]
    fn test_blank_denial_reason_fails_validation() {
        let body = DenyRequestBody { reason: String::new() };

        assert!(body.validate().is_err());
    }
}
