//! Tests for the balance ledger and its read cache

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal_macros::dec;

use core_kernel::{Clock, Company, ManualClock, Money, UserId};
use domain_balance::{BalanceCache, BalanceKey, LedgerMovement, UserBalance};
use test_utils::{balance_of, ledger_balance_strategy, positive_money_strategy, StringFixtures};

fn key() -> BalanceKey {
    BalanceKey::new(UserId::new(), Company::new("Acme Ltda"))
}

// ============================================================================
// Ledger Tests
// ============================================================================

mod ledger_tests {
    use super::*;

    #[test]
    fn test_missing_row_is_zero() {
        let key = key();
        let row = UserBalance::zero(key.clone(), Utc::now());

        assert_eq!(row.balance, Money::zero());
        assert_eq!(row.key(), key);
    }

    #[test]
    fn test_register_edit_delete_sequence() {
        let mut row = UserBalance::zero(key(), Utc::now());
        row.credit(Money::new(dec!(500)), Utc::now()).unwrap();

        // register 120
        row.debit(Money::new(dec!(120)), Utc::now()).unwrap();
        // edit 120 -> 150
        let edit = LedgerMovement::for_adjustment(Money::new(dec!(120)), Money::new(dec!(150))).unwrap();
        row.apply(edit, Utc::now()).unwrap();
        assert_eq!(row.balance, Money::new(dec!(350)));

        // delete 150
        row.credit(Money::new(dec!(150)), Utc::now()).unwrap();
        assert_eq!(row.balance, Money::new(dec!(500)));
    }

    #[test]
    fn test_movement_updates_timestamp() {
        let created = Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap();
        let later = created + Duration::hours(2);
        let mut row = UserBalance::zero(key(), created);

        row.debit(Money::new(dec!(1)), later).unwrap();

        assert_eq!(row.created_at, created);
        assert_eq!(row.updated_at, later);
    }
}

// ============================================================================
// Cache Tests
// ============================================================================

mod cache_tests {
    use super::*;

    fn cache_with_clock() -> (BalanceCache, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap());
        let cache = BalanceCache::new(Arc::new(clock.clone()), Duration::seconds(60));
        (cache, clock)
    }

    #[tokio::test]
    async fn test_cached_row_is_returned() {
        let (cache, clock) = cache_with_clock();
        let row = UserBalance::zero(key(), clock.now());

        cache.insert(row.clone()).await;

        assert_eq!(cache.get(&row.key()).await, Some(row));
    }

    #[tokio::test]
    async fn test_entries_expire_after_ttl() {
        let (cache, clock) = cache_with_clock();
        let row = UserBalance::zero(key(), clock.now());
        cache.insert(row.clone()).await;

        clock.advance(Duration::seconds(59));
        assert!(cache.get(&row.key()).await.is_some());

        clock.advance(Duration::seconds(1));
        assert!(cache.get(&row.key()).await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalidate_user_drops_every_company() {
        let (cache, clock) = cache_with_clock();
        let user = UserId::new();
        let other = UserId::new();

        for company in ["Acme", "Globex"] {
            cache
                .insert(UserBalance::zero(BalanceKey::new(user, Company::new(company)), clock.now()))
                .await;
        }
        cache
            .insert(UserBalance::zero(BalanceKey::new(other, Company::new("Acme")), clock.now()))
            .await;

        cache.invalidate_user(&user).await;

        assert_eq!(cache.len().await, 1);
        assert!(cache.get(&BalanceKey::new(other, Company::new("Acme"))).await.is_some());
    }

    #[tokio::test]
    async fn test_invalidate_single_key() {
        let (cache, clock) = cache_with_clock();
        let row = UserBalance::zero(key(), clock.now());
        cache.insert(row.clone()).await;

        cache.invalidate(&row.key()).await;

        assert!(cache.get(&row.key()).await.is_none());
    }
    #[tokio::test]
    async fn test_read_started_before_invalidation_is_not_cached() {
        let (cache, clock) = cache_with_clock();
        let stale = UserBalance::zero(key(), clock.now());
        let generation = cache.generation().await;

        cache.invalidate(&stale.key()).await;

        assert!(!cache.insert_if_fresh(stale.clone(), generation).await);
        assert!(cache.get(&stale.key()).await.is_none());
    }

    #[tokio::test]
    async fn test_read_without_intervening_invalidation_is_cached() {
        let (cache, clock) = cache_with_clock();
        let row = UserBalance::zero(key(), clock.now());
        let other = UserBalance::zero(key(), clock.now());
        cache.insert(other.clone()).await;
        let generation = cache.generation().await;

        assert!(cache.insert_if_fresh(row.clone(), generation).await);
        assert_eq!(cache.get(&row.key()).await, Some(row));
        assert_eq!(cache.len().await, 2);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #[test]
    fn prop_fundable_never_exceeds_either_side(
        balance in ledger_balance_strategy(),
        requested in positive_money_strategy(),
    ) {
        let row = balance_of(UserId::new(), StringFixtures::company(), balance);

        let funded = row.fundable(requested);

        prop_assert!(funded <= requested);
        prop_assert!(funded <= row.balance.non_negative());
        prop_assert!(!funded.is_negative());
    }

    #[test]
    fn prop_register_then_delete_restores_balance(
        start in ledger_balance_strategy(),
        amount in positive_money_strategy(),
    ) {
        let mut row = balance_of(UserId::new(), StringFixtures::company(), start);

        row.debit(amount, Utc::now()).unwrap();
        row.credit(amount, Utc::now()).unwrap();

        prop_assert_eq!(row.balance, start);
    }
}
