//! Data Transfer Objects

pub mod requests;
pub mod blocks;
pub mod balances;

use rust_decimal::Decimal;
use validator::ValidationError;

/// Rejects zero and negative amounts
pub(crate) fn positive_amount(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        let mut err = ValidationError::new("range");
        err.message = Some("amount must be greater than zero".into());
        return Err(err);
    }
    Ok(())
}
