//! Test Data Builders
//!
//! Builder patterns for constructing lifecycle entities with sensible
//! defaults. Tests set only the fields they care about.
//!
//! Builders write fields directly instead of replaying transitions, so a
//! request can be placed in any status without an approval chain.

use chrono::NaiveDate;
use core_kernel::{Company, Money, UserId};
use domain_accounting::{AccountingBlock, BlockCode, ExpenseKind, NewExpense, PaymentMethod};
use domain_balance::{BalanceKey, UserBalance};
use domain_request::{NewRequest, PayoutDetails, Request, RequestError, RequestStatus};

use crate::fixtures::{IdFixtures, MoneyFixtures, PayoutFixtures, StringFixtures, TemporalFixtures};

/// Builder for requests
pub struct RequestBuilder {
    amount: Money,
    company: Company,
    requester_id: UserId,
    validator_id: UserId,
    payout: PayoutDetails,
    status: RequestStatus,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            amount: MoneyFixtures::brl_500(),
            company: StringFixtures::company(),
            requester_id: IdFixtures::requester_id(),
            validator_id: IdFixtures::validator_id(),
            payout: PayoutFixtures::pix_email(),
            status: RequestStatus::Waiting,
        }
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_payout(mut self, payout: PayoutDetails) -> Self {
        self.payout = payout;
        self
    }

    /// Places the request directly in `status`
    pub fn in_status(mut self, status: RequestStatus) -> Self {
        self.status = status;
        self
    }

    pub fn build(self) -> Result<Request, RequestError> {
        let submitted = NewRequest {
            amount: self.amount,
            company: self.company,
            requester_id: self.requester_id,
            validator_id: self.validator_id,
            payout: self.payout,
            description: None,
        };
        let mut request = Request::new(
            submitted,
            MoneyFixtures::zero(),
            TemporalFixtures::reference_instant(),
        )?;
        request.status = self.status;
        if self.status != RequestStatus::Waiting {
            request.authorizer_id = Some(IdFixtures::authorizer_id());
        }
        Ok(request)
    }
}

/// Builder for accounting blocks
pub struct BlockBuilder {
    initial_amount: Money,
    current_balance: Option<Money>,
    request: Option<Request>,
}

impl Default for BlockBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockBuilder {
    pub fn new() -> Self {
        Self {
            initial_amount: MoneyFixtures::brl_500(),
            current_balance: None,
            request: None,
        }
    }

    pub fn with_initial_amount(mut self, amount: Money) -> Self {
        self.initial_amount = amount;
        self
    }

    /// Running balance; defaults to the initial amount
    pub fn with_current_balance(mut self, balance: Money) -> Self {
        self.current_balance = Some(balance);
        self
    }

    /// Owning request; defaults to an accepted request from [`RequestBuilder`]
    pub fn for_request(mut self, request: Request) -> Self {
        self.request = Some(request);
        self
    }

    pub fn build(self) -> Result<AccountingBlock, RequestError> {
        let request = match self.request {
            Some(request) => request,
            None => RequestBuilder::new()
                .with_amount(self.initial_amount)
                .in_status(RequestStatus::Accepts)
                .build()?,
        };
        let mut block = AccountingBlock::open_for(
            &request,
            BlockCode::first(),
            self.initial_amount,
            TemporalFixtures::reference_instant(),
        );
        if let Some(balance) = self.current_balance {
            block.current_balance = balance;
        }
        Ok(block)
    }
}

/// Builder for expense submissions
pub struct ExpenseBuilder {
    amount: Money,
    category: String,
    payment_method: PaymentMethod,
    date: NaiveDate,
    kind: ExpenseKind,
}

impl Default for ExpenseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpenseBuilder {
    pub fn new() -> Self {
        Self {
            amount: MoneyFixtures::brl_35_90(),
            category: StringFixtures::category().to_string(),
            payment_method: PaymentMethod::Pix,
            date: TemporalFixtures::expense_date(),
            kind: ExpenseKind::Debit,
        }
    }

    /// A debit of `amount`
    pub fn debit(amount: Money) -> Self {
        Self::new().with_amount(amount)
    }

    /// A reimbursement entry of `amount`
    pub fn reimbursement(amount: Money) -> Self {
        Self::new()
            .with_amount(amount)
            .with_kind(ExpenseKind::Reimbursement)
            .with_category("Reembolso")
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_kind(mut self, kind: ExpenseKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = method;
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    pub fn build(self) -> NewExpense {
        NewExpense {
            amount: self.amount,
            category: self.category,
            payment_method: self.payment_method,
            date: self.date,
            kind: self.kind,
            description: None,
            image_urls: Vec::new(),
        }
    }
}

/// Ledger row with a given balance
pub fn balance_of(user_id: UserId, company: Company, amount: Money) -> UserBalance {
    let mut balance = UserBalance::zero(BalanceKey::new(user_id, company), TemporalFixtures::reference_instant());
    balance.balance = amount;
    balance
}
