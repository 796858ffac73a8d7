//! Request state machine
//!
//! Authority per step:
//!
//! | From       | To         | Who                              |
//! |------------|------------|----------------------------------|
//! | WAITING    | VALIDATES  | the assigned validator           |
//! | VALIDATES  | AUTHORIZES | the authorizer picked on validate |
//! | AUTHORIZES | ACCEPTS    | FINANCE                          |
//! | ACCEPTS    | COMPLETED  | FINANCE                          |
//! | any        | DENIED     | whoever may advance the state    |
//!
//! ADMIN may force any transition out of any state except COMPLETED.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use core_kernel::UserId;
use crate::authority::Actor;
use crate::error::RequestError;
use crate::request::{Request, RequestStatus};

/// A requested move through the approval pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Transition {
    /// Validator approves and picks the authorizer
    Validate { authorizer_id: UserId },
    Authorize,
    Accept,
    /// Finance confirms payment
    Complete { proof_of_payment: String },
    Deny { reason: String },
}

impl Transition {
    pub fn target(&self) -> RequestStatus {
        match self {
            Transition::Validate { .. } => RequestStatus::Validates,
            Transition::Authorize => RequestStatus::Authorizes,
            Transition::Accept => RequestStatus::Accepts,
            Transition::Complete { .. } => RequestStatus::Completed,
            Transition::Deny { .. } => RequestStatus::Denied,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Transition::Validate { .. } => "validate",
            Transition::Authorize => "authorize",
            Transition::Accept => "accept",
            Transition::Complete { .. } => "complete",
            Transition::Deny { .. } => "deny",
        }
    }

    fn check_payload(&self) -> Result<(), RequestError> {
        match self {
            Transition::Deny { reason } if reason.trim().is_empty() => {
                Err(RequestError::validation("a denial reason is required"))
            }
            Transition::Complete { proof_of_payment } if proof_of_payment.trim().is_empty() => {
                Err(RequestError::validation("a proof of payment is required"))
            }
            _ => Ok(()),
        }
    }
}

/// Result of a successful transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: RequestStatus,
    pub to: RequestStatus,
}

impl TransitionOutcome {
    /// True when the new state must draw on the requester's ledger
    pub fn draws_on_ledger(&self) -> bool {
        self.to.draws_on_ledger()
    }
}

impl Request {
    /// Returns true if `actor` may advance (or deny) the request from its
    /// current state
    pub fn may_advance(&self, actor: &Actor) -> bool {
        if actor.is_admin() {
            return true;
        }
        match self.status {
            RequestStatus::Waiting => actor.id == self.validator_id,
            RequestStatus::Validates => self.authorizer_id == Some(actor.id),
            RequestStatus::Authorizes | RequestStatus::Accepts => actor.role.can_disburse(),
            RequestStatus::Completed | RequestStatus::Denied => false,
        }
    }

    /// Applies `transition` on behalf of `actor`
    ///
    /// The caller is responsible for the ledger draw when the outcome
    /// [draws on the ledger](TransitionOutcome::draws_on_ledger).
    pub fn apply_transition(
        &mut self,
        actor: &Actor,
        transition: Transition,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, RequestError> {
        let from = self.status;
        let to = transition.target();

        if from.is_terminal() {
            return Err(RequestError::TerminalState { status: from });
        }
        transition.check_payload()?;

        if from == to {
            return Err(RequestError::InvalidTransition { from, to });
        }

        if !actor.is_admin() {
            let in_sequence = match to {
                RequestStatus::Denied => from != RequestStatus::Denied,
                _ => to.predecessor() == Some(from),
            };
            if !in_sequence {
                return Err(RequestError::InvalidTransition { from, to });
            }
            if !self.may_advance(actor) {
                return Err(RequestError::forbidden(
                    actor.id,
                    format!("{} a request in {}", transition.name(), from),
                ));
            }
        }

        match transition {
            Transition::Validate { authorizer_id } => {
                self.authorizer_id = Some(authorizer_id);
            }
            Transition::Complete { proof_of_payment } => {
                self.proof_of_payment = Some(proof_of_payment.trim().to_string());
            }
            Transition::Deny { reason } => {
                self.denial_reason = Some(reason.trim().to_string());
            }
            Transition::Authorize | Transition::Accept => {}
        }

        self.status = to;
        self.updated_at = now;

        debug!(request_id = %self.id, %from, %to, actor = %actor.id, "Request transitioned");

        Ok(TransitionOutcome { from, to })
    }
}
