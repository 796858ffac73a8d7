//! Request aggregate
//!
//! # Invariants
//!
//! - `amount` is positive and never changes after creation
//! - `balance_deducted <= amount`
//! - `balance_deducted <= initial_user_balance`: the ledger never funds more
//!   than it held when the request was created
//! - `current_balance = amount - balance_deducted` once funded
//! - A COMPLETED request is immutable

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{BlockId, Company, Money, RequestId, UserId};
use crate::error::RequestError;

/// Request lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    /// Created, waiting for the validator
    Waiting,
    /// Validated, waiting for the authorizer
    Validates,
    /// Authorized, waiting for finance
    Authorizes,
    /// Accepted by finance, funds drawn from the ledger
    Accepts,
    /// Paid out; terminal
    Completed,
    /// Refused by one of the approvers
    Denied,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Waiting => "WAITING",
            RequestStatus::Validates => "VALIDATES",
            RequestStatus::Authorizes => "AUTHORIZES",
            RequestStatus::Accepts => "ACCEPTS",
            RequestStatus::Completed => "COMPLETED",
            RequestStatus::Denied => "DENIED",
        }
    }

    /// Returns true once no further mutation is allowed
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Completed)
    }

    /// States whose entry draws on the requester's ledger
    pub fn draws_on_ledger(&self) -> bool {
        matches!(self, RequestStatus::Accepts | RequestStatus::Completed)
    }

    /// The state that normally comes before this one
    pub fn predecessor(&self) -> Option<RequestStatus> {
        match self {
            RequestStatus::Waiting => None,
            RequestStatus::Validates => Some(RequestStatus::Waiting),
            RequestStatus::Authorizes => Some(RequestStatus::Validates),
            RequestStatus::Accepts => Some(RequestStatus::Authorizes),
            RequestStatus::Completed => Some(RequestStatus::Accepts),
            RequestStatus::Denied => None,
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "WAITING" => Ok(RequestStatus::Waiting),
            "VALIDATES" => Ok(RequestStatus::Validates),
            "AUTHORIZES" => Ok(RequestStatus::Authorizes),
            "ACCEPTS" => Ok(RequestStatus::Accepts),
            "COMPLETED" => Ok(RequestStatus::Completed),
            "DENIED" => Ok(RequestStatus::Denied),
            other => Err(RequestError::validation(format!("unknown request status '{}'", other))),
        }
    }
}

/// Kind of request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestType {
    /// Advance paid to the employee before spending
    Deposit,
    /// Recovery of a negative block balance
    Reimbursement,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::Deposit => "DEPOSIT",
            RequestType::Reimbursement => "REIMBURSEMENT",
        }
    }
}

/// Kind of PIX key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PixKeyType {
    Cpf,
    Cnpj,
    Email,
    Phone,
    Random,
}

/// Where the money is paid out
///
/// Either a PIX key or a full bank account (bank, agency and account) must
/// be present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutDetails {
    pub bank: Option<String>,
    pub agency: Option<String>,
    pub account: Option<String>,
    pub pix_key: Option<String>,
    pub pix_key_type: Option<PixKeyType>,
}

impl PayoutDetails {
    pub fn pix(key: impl Into<String>, key_type: PixKeyType) -> Self {
        Self {
            pix_key: Some(key.into()),
            pix_key_type: Some(key_type),
            ..Default::default()
        }
    }

    pub fn bank_account(bank: impl Into<String>, agency: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            bank: Some(bank.into()),
            agency: Some(agency.into()),
            account: Some(account.into()),
            ..Default::default()
        }
    }

    fn filled(field: &Option<String>) -> bool {
        field.as_deref().is_some_and(|value| !value.trim().is_empty())
    }

    pub fn has_pix(&self) -> bool {
        Self::filled(&self.pix_key)
    }

    pub fn has_bank_account(&self) -> bool {
        Self::filled(&self.bank) && Self::filled(&self.agency) && Self::filled(&self.account)
    }

    pub fn validate(&self) -> Result<(), RequestError> {
        if self.has_pix() && self.pix_key_type.is_none() {
            return Err(RequestError::validation("PIX key type is required when a PIX key is given"));
        }
        if !self.has_pix() && !self.has_bank_account() {
            return Err(RequestError::validation(
                "payout requires a PIX key or bank, agency and account",
            ));
        }
        Ok(())
    }
}

/// Delivery state of the last notification sent for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationStatus {
    Sent,
    Error,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Sent => "SENT",
            NotificationStatus::Error => "ERROR",
        }
    }
}

/// Correlation record of the last outbound notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub message_id: Option<String>,
    pub status: NotificationStatus,
    pub error: Option<String>,
}

impl NotificationRecord {
    pub fn sent(message_id: impl Into<String>) -> Self {
        Self {
            message_id: Some(message_id.into()),
            status: NotificationStatus::Sent,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            message_id: None,
            status: NotificationStatus::Error,
            error: Some(error.into()),
        }
    }
}

/// Data supplied by the requester
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRequest {
    pub amount: Money,
    pub company: Company,
    pub requester_id: UserId,
    pub validator_id: UserId,
    pub payout: PayoutDetails,
    pub description: Option<String>,
}

/// A fund request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub request_type: RequestType,
    pub status: RequestStatus,
    pub amount: Money,
    pub current_balance: Money,
    pub initial_user_balance: Money,
    pub balance_deducted: Money,
    pub company: Company,
    pub requester_id: UserId,
    pub validator_id: UserId,
    pub authorizer_id: Option<UserId>,
    pub payout: PayoutDetails,
    pub description: Option<String>,
    pub denial_reason: Option<String>,
    pub proof_of_payment: Option<String>,
    pub notification: Option<NotificationRecord>,
    pub origin_block: Option<BlockId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Request {
    /// Creates a WAITING deposit request
    ///
    /// `ledger_snapshot` is the requester's balance for the company at the
    /// time of creation.
    pub fn new(new: NewRequest, ledger_snapshot: Money, now: DateTime<Utc>) -> Result<Self, RequestError> {
        if !new.amount.is_positive() {
            return Err(RequestError::validation(format!(
                "request amount must be positive, got {}",
                new.amount
            )));
        }
        if new.company.is_blank() {
            return Err(RequestError::validation("company is required"));
        }
        new.payout.validate()?;

        Ok(Self {
            id: RequestId::new(),
            request_type: RequestType::Deposit,
            status: RequestStatus::Waiting,
            amount: new.amount,
            current_balance: new.amount,
            initial_user_balance: ledger_snapshot,
            balance_deducted: Money::zero(),
            company: new.company,
            requester_id: new.requester_id,
            validator_id: new.validator_id,
            authorizer_id: None,
            payout: new.payout,
            description: new.description.filter(|d| !d.trim().is_empty()),
            denial_reason: None,
            proof_of_payment: None,
            notification: None,
            origin_block: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Creates a REIMBURSEMENT request recovering a negative block balance
    ///
    /// Payout details, company and approvers are copied from `origin`. The
    /// request enters the pipeline at AUTHORIZES.
    pub fn reimbursement_of(
        origin: &Request,
        origin_block: BlockId,
        amount: Money,
        ledger_snapshot: Money,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, RequestError> {
        if !amount.is_positive() {
            return Err(RequestError::validation(format!(
                "reimbursement amount must be positive, got {}",
                amount
            )));
        }

        Ok(Self {
            id: RequestId::new(),
            request_type: RequestType::Reimbursement,
            status: RequestStatus::Authorizes,
            amount,
            current_balance: amount,
            initial_user_balance: ledger_snapshot,
            balance_deducted: Money::zero(),
            company: origin.company.clone(),
            requester_id: origin.requester_id,
            validator_id: origin.validator_id,
            authorizer_id: origin.authorizer_id,
            payout: origin.payout.clone(),
            description: Some(description.into()),
            denial_reason: None,
            proof_of_payment: None,
            notification: None,
            origin_block: Some(origin_block),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_reimbursement(&self) -> bool {
        self.request_type == RequestType::Reimbursement
    }

    /// Most the ledger may still contribute to this request
    ///
    /// Bounded by the unfunded remainder and by the part of the creation-time
    /// snapshot not yet drawn. Credits reaching the ledger after creation are
    /// not available to this request.
    pub fn funding_allowance(&self) -> Money {
        let unspent_snapshot = (self.initial_user_balance - self.balance_deducted).non_negative();
        self.current_balance.non_negative().min(unspent_snapshot)
    }

    /// Records a draw of `deducted` from the requester's ledger
    ///
    /// Draws accumulate: a request accepted and later completed may be
    /// funded twice if the ledger was short the first time.
    pub fn apply_funding(&mut self, deducted: Money, now: DateTime<Utc>) -> Result<(), RequestError> {
        if deducted.is_negative() || deducted > self.current_balance {
            return Err(RequestError::FundingExceedsRemainder {
                deducted,
                remaining: self.current_balance,
            });
        }
        if deducted > self.funding_allowance() {
            return Err(RequestError::FundingExceedsSnapshot {
                deducted,
                snapshot: self.initial_user_balance,
                drawn: self.balance_deducted,
            });
        }
        self.balance_deducted = self.balance_deducted.checked_add(deducted)?;
        self.current_balance = self.current_balance.checked_sub(deducted)?;
        self.updated_at = now;
        Ok(())
    }

    /// Stores the outcome of the last notification
    ///
    /// Allowed in any state, including COMPLETED: delivery tracking is not a
    /// business mutation.
    pub fn record_notification(&mut self, record: NotificationRecord) {
        self.notification = Some(record);
    }
}
