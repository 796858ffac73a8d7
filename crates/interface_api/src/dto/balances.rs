//! Balance DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use domain_balance::UserBalance;

#[derive(Debug, Default, Deserialize)]
pub struct BalanceQuery {
    /// Another user's ledger; FINANCE and ADMIN only
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub user_id: Uuid,
    pub company: String,
    pub balance: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl From<UserBalance> for BalanceResponse {
    fn from(balance: UserBalance) -> Self {
        Self {
            user_id: *balance.user_id.as_uuid(),
            company: balance.company.as_str().to_string(),
            balance: balance.balance.amount(),
            updated_at: balance.updated_at,
        }
    }
}
