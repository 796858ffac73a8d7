//! Expenses recorded against a block
//!
//! Amounts are always positive; the direction comes from [`ExpenseKind`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{BlockId, Company, ExpenseId, Money, UserId};
use crate::block::AccountingBlock;
use crate::error::AccountingError;

/// Receipt photos allowed per expense
pub const MAX_RECEIPT_IMAGES: usize = 3;

/// Economic direction of an expense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpenseKind {
    /// Cash in ("entrada")
    Credit,
    /// Spend ("saída")
    Debit,
    /// Money returned to the company ("reembolso")
    Reimbursement,
}

impl ExpenseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseKind::Credit => "CREDIT",
            ExpenseKind::Debit => "DEBIT",
            ExpenseKind::Reimbursement => "REIMBURSEMENT",
        }
    }

    /// Effect of `amount` on the block balance
    pub fn signed(&self, amount: Money) -> Money {
        match self {
            ExpenseKind::Credit | ExpenseKind::Reimbursement => amount,
            ExpenseKind::Debit => -amount,
        }
    }

    /// Label printed on the closing statement
    pub fn label(&self) -> &'static str {
        match self {
            ExpenseKind::Credit => "Entrada",
            ExpenseKind::Debit => "Saída",
            ExpenseKind::Reimbursement => "Reembolso",
        }
    }
}

impl fmt::Display for ExpenseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an expense was paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Pix,
    Cash,
    CreditCard,
    DebitCard,
    BankTransfer,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Pix => "PIX",
            PaymentMethod::Cash => "CASH",
            PaymentMethod::CreditCard => "CREDIT_CARD",
            PaymentMethod::DebitCard => "DEBIT_CARD",
            PaymentMethod::BankTransfer => "BANK_TRANSFER",
            PaymentMethod::Other => "OTHER",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Pix => "PIX",
            PaymentMethod::Cash => "Dinheiro",
            PaymentMethod::CreditCard => "Cartão de crédito",
            PaymentMethod::DebitCard => "Cartão de débito",
            PaymentMethod::BankTransfer => "Transferência",
            PaymentMethod::Other => "Outro",
        }
    }
}

/// Data for a new expense
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExpense {
    pub amount: Money,
    pub category: String,
    pub payment_method: PaymentMethod,
    pub date: NaiveDate,
    pub kind: ExpenseKind,
    pub description: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

fn validate_fields(amount: Money, category: &str, image_urls: &[String]) -> Result<(), AccountingError> {
    if !amount.is_positive() {
        return Err(AccountingError::invalid_expense(format!(
            "amount must be positive, got {}",
            amount
        )));
    }
    if category.trim().is_empty() {
        return Err(AccountingError::invalid_expense("category is required"));
    }
    if image_urls.len() > MAX_RECEIPT_IMAGES {
        return Err(AccountingError::invalid_expense(format!(
            "at most {} receipt images, got {}",
            MAX_RECEIPT_IMAGES,
            image_urls.len()
        )));
    }
    Ok(())
}

impl NewExpense {
    pub fn validate(&self) -> Result<(), AccountingError> {
        validate_fields(self.amount, &self.category, &self.image_urls)
    }
}

/// Partial update of an expense; `None` keeps the current value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseUpdate {
    pub amount: Option<Money>,
    pub category: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub date: Option<NaiveDate>,
    pub kind: Option<ExpenseKind>,
    pub description: Option<String>,
    pub image_urls: Option<Vec<String>>,
}

/// Before/after figures of an edit, used to move the ledger and block balance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpenseRevision {
    pub old_amount: Money,
    pub new_amount: Money,
    pub old_effect: Money,
    pub new_effect: Money,
}

impl ExpenseRevision {
    /// Change to apply to the block's running balance
    pub fn block_delta(&self) -> Money {
        self.new_effect - self.old_effect
    }
}

/// A single entry inside a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub block_id: BlockId,
    pub company: Company,
    pub created_by: UserId,
    pub amount: Money,
    pub category: String,
    pub payment_method: PaymentMethod,
    pub date: NaiveDate,
    pub kind: ExpenseKind,
    pub description: Option<String>,
    pub image_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Expense {
    /// Builds an expense for `block`, copying its company
    pub fn record(
        block: &AccountingBlock,
        new: NewExpense,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<Self, AccountingError> {
        new.validate()?;
        Ok(Self {
            id: ExpenseId::new(),
            block_id: block.id,
            company: block.company.clone(),
            created_by,
            amount: new.amount,
            category: new.category.trim().to_string(),
            payment_method: new.payment_method,
            date: new.date,
            kind: new.kind,
            description: new.description,
            image_urls: new.image_urls,
            created_at: now,
            updated_at: now,
        })
    }

    /// Effect of this expense on the block balance
    pub fn signed_effect(&self) -> Money {
        self.kind.signed(self.amount)
    }

    pub fn ensure_created_by(&self, actor: UserId) -> Result<(), AccountingError> {
        if self.created_by != actor {
            return Err(AccountingError::NotCreator {
                expense_id: self.id,
                actor,
            });
        }
        Ok(())
    }

    /// Applies `update`, leaving the expense untouched when validation fails
    pub fn apply_update(&mut self, update: ExpenseUpdate, now: DateTime<Utc>) -> Result<ExpenseRevision, AccountingError> {
        let amount = update.amount.unwrap_or(self.amount);
        let category = update
            .category
            .map(|c| c.trim().to_string())
            .unwrap_or_else(|| self.category.clone());
        let image_urls = update.image_urls.unwrap_or_else(|| self.image_urls.clone());
        validate_fields(amount, &category, &image_urls)?;

        let old_amount = self.amount;
        let old_effect = self.signed_effect();

        self.amount = amount;
        self.category = category;
        self.image_urls = image_urls;
        if let Some(method) = update.payment_method {
            self.payment_method = method;
        }
        if let Some(date) = update.date {
            self.date = date;
        }
        if let Some(kind) = update.kind {
            self.kind = kind;
        }
        if update.description.is_some() {
            self.description = update.description;
        }
        self.updated_at = now;

        Ok(ExpenseRevision {
            old_amount,
            new_amount: self.amount,
            old_effect,
            new_effect: self.signed_effect(),
        })
    }
}
