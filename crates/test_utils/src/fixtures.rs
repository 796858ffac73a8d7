//! Pre-built Test Fixtures
//!
//! Provides ready-to-use test data for the lifecycle entities. These fixtures
//! are consistent and predictable so assertions can use literal values.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use core_kernel::{Company, Money, UserId};
use domain_request::{Actor, PayoutDetails, PixKeyType, Role};
use rust_decimal_macros::dec;
use uuid::Uuid;

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// A typical advance
    pub fn brl_500() -> Money {
        Money::new(dec!(500.00))
    }

    /// A small purchase
    pub fn brl_35_90() -> Money {
        Money::new(dec!(35.90))
    }

    pub fn zero() -> Money {
        Money::zero()
    }
}

/// Fixture for fixed points in time
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// Reference instant used by manual clocks
    pub fn reference_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 9, 30, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    /// Date printed on expenses
    pub fn expense_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap_or_default()
    }
}

/// Fixture for well-known identifiers
pub struct IdFixtures;

impl IdFixtures {
    /// Stable user id so failures print the same value on every run
    pub fn requester_id() -> UserId {
        UserId::from_uuid(Uuid::from_u128(0x0001))
    }

    pub fn validator_id() -> UserId {
        UserId::from_uuid(Uuid::from_u128(0x0002))
    }

    pub fn authorizer_id() -> UserId {
        UserId::from_uuid(Uuid::from_u128(0x0003))
    }

    pub fn finance_id() -> UserId {
        UserId::from_uuid(Uuid::from_u128(0x0004))
    }

    pub fn admin_id() -> UserId {
        UserId::from_uuid(Uuid::from_u128(0x0005))
    }
}

/// Fixture for string data
pub struct StringFixtures;

impl StringFixtures {
    pub fn company() -> Company {
        Company::new("Acme Ltda")
    }

    pub fn category() -> &'static str {
        "Alimentação"
    }
}

/// Fixture for payout details
pub struct PayoutFixtures;

impl PayoutFixtures {
    pub fn pix_email() -> PayoutDetails {
        PayoutDetails::pix("joao.silva@acme.com.br", PixKeyType::Email)
    }

    pub fn bank_account() -> PayoutDetails {
        PayoutDetails::bank_account("341", "0001", "12345-6")
    }
}

/// Fixture for the actors of one approval chain
pub struct ActorFixtures;

impl ActorFixtures {
    pub fn requester() -> Actor {
        Actor::new(IdFixtures::requester_id(), Role::User)
            .with_name("João Silva")
            .with_email("joao.silva@acme.com.br")
    }

    pub fn validator() -> Actor {
        Actor::new(IdFixtures::validator_id(), Role::User).with_name("Maria Souza")
    }

    pub fn authorizer() -> Actor {
        Actor::new(IdFixtures::authorizer_id(), Role::User).with_name("Carlos Lima")
    }

    pub fn finance() -> Actor {
        Actor::new(IdFixtures::finance_id(), Role::Finance).with_name("Financeiro")
    }

    pub fn admin() -> Actor {
        Actor::new(IdFixtures::admin_id(), Role::Admin).with_name("Administrador")
    }

    /// The whole chain, in pipeline order
    pub fn all() -> Vec<Actor> {
        vec![
            Self::requester(),
            Self::validator(),
            Self::authorizer(),
            Self::finance(),
            Self::admin(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_fixture_ids_are_distinct() {
        let mut ids: Vec<_> = ActorFixtures::all().into_iter().map(|a| a.id).collect();
        ids.sort_by_key(|id| *id.as_uuid());
        ids.dedup();

        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn test_payout_fixtures_are_valid() {
        assert!(PayoutFixtures::pix_email().validate().is_ok());
        assert!(PayoutFixtures::bank_account().validate().is_ok());
    }
}
