//! Ledger rows and movements

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{Company, Money, UserId};
use crate::error::BalanceError;

/// Identity of a ledger row: one balance per user per company
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BalanceKey {
    pub user_id: UserId,
    pub company: Company,
}

impl BalanceKey {
    pub fn new(user_id: UserId, company: Company) -> Self {
        Self { user_id, company }
    }
}

/// A single signed movement against a ledger row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "direction", content = "amount", rename_all = "snake_case")]
pub enum LedgerMovement {
    /// Money leaves the employee's balance
    Debit(Money),
    /// Money returns to the employee's balance
    Credit(Money),
}

impl LedgerMovement {
    /// Movement that turns `old` into `new` for the same economic direction
    ///
    /// An expense that grows by 20 debits 20 more; one that shrinks by 20
    /// credits 20 back.
    pub fn for_adjustment(old: Money, new: Money) -> Option<Self> {
        let delta = new - old;
        if delta.is_zero() {
            None
        } else if delta.is_positive() {
            Some(LedgerMovement::Debit(delta))
        } else {
            Some(LedgerMovement::Credit(delta.abs()))
        }
    }

    /// Effect on the balance, negative for debits
    pub fn signed(&self) -> Money {
        match self {
            LedgerMovement::Debit(amount) => -*amount,
            LedgerMovement::Credit(amount) => *amount,
        }
    }

    fn magnitude(&self) -> Money {
        match self {
            LedgerMovement::Debit(amount) | LedgerMovement::Credit(amount) => *amount,
        }
    }
}

/// Ledger row for one (user, company) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBalance {
    pub user_id: UserId,
    pub company: Company,
    pub balance: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserBalance {
    /// The row a missing key stands for
    pub fn zero(key: BalanceKey, now: DateTime<Utc>) -> Self {
        Self {
            user_id: key.user_id,
            company: key.company,
            balance: Money::zero(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> BalanceKey {
        BalanceKey::new(self.user_id, self.company.clone())
    }

    /// Portion of `requested` this balance can fund
    ///
    /// The ledger never funds more than it holds, and a negative ledger funds
    /// nothing.
    pub fn fundable(&self, requested: Money) -> Money {
        self.balance.non_negative().min(requested.non_negative())
    }

    /// Applies a movement and returns the new balance
    pub fn apply(&mut self, movement: LedgerMovement, now: DateTime<Utc>) -> Result<Money, BalanceError> {
        if movement.magnitude().is_negative() {
            return Err(BalanceError::NegativeMovement(movement.magnitude()));
        }
        self.balance = self.balance.checked_add(movement.signed())?;
        self.updated_at = now;
        Ok(self.balance)
    }

    pub fn debit(&mut self, amount: Money, now: DateTime<Utc>) -> Result<Money, BalanceError> {
        self.apply(LedgerMovement::Debit(amount), now)
    }

    pub fn credit(&mut self, amount: Money, now: DateTime<Utc>) -> Result<Money, BalanceError> {
        self.apply(LedgerMovement::Credit(amount), now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn balance_of(amount: rust_decimal::Decimal) -> UserBalance {
        let mut row = UserBalance::zero(BalanceKey::new(UserId::new(), Company::new("Acme")), Utc::now());
        row.balance = Money::new(amount);
        row
    }

    #[test]
    fn test_fundable_is_capped_by_balance() {
        let row = balance_of(dec!(50));
        assert_eq!(row.fundable(Money::new(dec!(200))), Money::new(dec!(50)));
    }

    #[test]
    fn test_fundable_is_capped_by_request() {
        let row = balance_of(dec!(500));
        assert_eq!(row.fundable(Money::new(dec!(200))), Money::new(dec!(200)));
    }

    #[test]
    fn test_negative_balance_funds_nothing() {
        let row = balance_of(dec!(-80));
        assert_eq!(row.fundable(Money::new(dec!(200))), Money::zero());
    }

    #[test]
    fn test_debit_may_go_negative() {
        let mut row = balance_of(dec!(10));
        let after = row.debit(Money::new(dec!(25)), Utc::now()).unwrap();
        assert_eq!(after, Money::new(dec!(-15)));
    }

    #[test]
    fn test_negative_movement_is_rejected() {
        let mut row = balance_of(dec!(10));
        let result = row.credit(Money::new(dec!(-5)), Utc::now());
        assert_eq!(result, Err(BalanceError::NegativeMovement(Money::new(dec!(-5)))));
        assert_eq!(row.balance, Money::new(dec!(10)));
    }

    #[test]
    fn test_adjustment_direction() {
        assert_eq!(
            LedgerMovement::for_adjustment(Money::new(dec!(100)), Money::new(dec!(130))),
            Some(LedgerMovement::Debit(Money::new(dec!(30))))
        );
        assert_eq!(
            LedgerMovement::for_adjustment(Money::new(dec!(100)), Money::new(dec!(60))),
            Some(LedgerMovement::Credit(Money::new(dec!(40))))
        );
        assert_eq!(LedgerMovement::for_adjustment(Money::new(dec!(5)), Money::new(dec!(5))), None);
    }
}
