//! Notification content
//!
//! Messages go to whoever has to act next, or back to the requester once the
//! request leaves the approvers' hands.

use serde::{Deserialize, Serialize};

use core_kernel::UserId;
use crate::request::{Request, RequestStatus, RequestType};
use crate::transition::TransitionOutcome;

/// A message addressed to one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub recipient: UserId,
    pub message: String,
}

fn kind_label(request: &Request) -> &'static str {
    match request.request_type {
        RequestType::Deposit => "solicitação",
        RequestType::Reimbursement => "solicitação de reembolso",
    }
}

/// Message sent to the validator when a request is created
pub fn creation_notice(request: &Request) -> Notice {
    Notice {
        recipient: request.validator_id,
        message: format!(
            "Nova {} de {} para {} aguardando sua validação.",
            kind_label(request),
            request.amount,
            request.company
        ),
    }
}

/// Message sent after a transition, if anyone needs to hear about it
pub fn transition_notice(request: &Request, outcome: &TransitionOutcome) -> Option<Notice> {
    let kind = kind_label(request);
    match outcome.to {
        RequestStatus::Waiting => None,
        RequestStatus::Validates => request.authorizer_id.map(|authorizer| Notice {
            recipient: authorizer,
            message: format!(
                "A {} de {} para {} foi validada e aguarda sua autorização.",
                kind, request.amount, request.company
            ),
        }),
        RequestStatus::Authorizes => Some(Notice {
            recipient: request.requester_id,
            message: format!("Sua {} de {} foi autorizada e aguarda o financeiro.", kind, request.amount),
        }),
        RequestStatus::Accepts => Some(Notice {
            recipient: request.requester_id,
            message: format!(
                "Sua {} de {} foi aceita. Abatido do seu saldo: {}. Valor a receber: {}.",
                kind, request.amount, request.balance_deducted, request.current_balance
            ),
        }),
        RequestStatus::Completed => Some(Notice {
            recipient: request.requester_id,
            message: format!("O pagamento da sua {} de {} foi concluído.", kind, request.amount),
        }),
        RequestStatus::Denied => Some(Notice {
            recipient: request.requester_id,
            message: format!(
                "Sua {} de {} foi negada. Motivo: {}",
                kind,
                request.amount,
                request.denial_reason.as_deref().unwrap_or("não informado")
            ),
        }),
    }
}
