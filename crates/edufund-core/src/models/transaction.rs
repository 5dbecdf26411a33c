//! Account transaction model
//!
//! Every movement on an education account, plus external payments collected
//! against invoices, is recorded as a transaction.

use super::text_enum;
use crate::error::AppError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Decimal places of a money amount
pub const MONEY_SCALE: u32 = 2;

/// Reject amounts with fractions of a cent
pub fn check_money_scale(field: &str, amount: Decimal) -> Result<(), AppError> {
    if amount.normalize().scale() > MONEY_SCALE {
        return Err(AppError::Validation(format!(
            "{} must have at most {} decimal places",
            field, MONEY_SCALE
        )));
    }
    Ok(())
}

text_enum! {
    /// What a transaction represents
    pub enum TransactionKind {
        /// Credit into the account
        TopUp => "top_up",
        /// Debit from the account to settle an invoice
        CoursePayment => "course_payment",
        /// Settlement collected outside the account; balance unchanged
        ExternalPayment => "external_payment",
    }
}

impl TransactionKind {
    /// Signed effect on the account balance for an amount
    pub fn balance_delta(&self, amount: Decimal) -> Decimal {
        match self {
            TransactionKind::TopUp => amount,
            TransactionKind::CoursePayment => -amount,
            TransactionKind::ExternalPayment => Decimal::ZERO,
        }
    }
}

text_enum! {
    /// Processing state of a transaction
    pub enum TransactionStatus {
        Pending => "pending",
        Completed => "completed",
        Failed => "failed",
    }
}

impl TransactionStatus {
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        matches!(
            (self, next),
            (TransactionStatus::Pending, TransactionStatus::Completed)
                | (TransactionStatus::Pending, TransactionStatus::Failed)
        )
    }

    pub fn is_final(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

text_enum! {
    /// Instrument used for a payment
    pub enum PaymentMethod {
        AccountBalance => "account_balance",
        Card => "card",
        BankTransfer => "bank_transfer",
    }
}

/// Transaction entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,

    /// Public reference shown on receipts
    pub reference: Uuid,

    pub account_id: i32,

    pub kind: TransactionKind,

    /// Always positive; direction follows `kind`
    pub amount: Decimal,

    /// Account balance after this transaction was applied
    pub balance_after: Option<Decimal>,

    pub status: TransactionStatus,

    pub payment_method: Option<PaymentMethod>,

    pub invoice_id: Option<i32>,

    pub topup_rule_id: Option<i32>,

    pub description: Option<String>,

    /// Username, `scheduler`, or the holder's NRIC
    pub performed_by: String,

    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// A completed transaction skeleton with a fresh reference
    pub fn completed(account_id: i32, kind: TransactionKind, amount: Decimal, performed_by: &str) -> Self {
        Self {
            id: 0,
            reference: Uuid::now_v7(),
            account_id,
            kind,
            amount,
            balance_after: None,
            status: TransactionStatus::Completed,
            payment_method: None,
            invoice_id: None,
            topup_rule_id: None,
            description: None,
            performed_by: performed_by.to_string(),
            created_at: Utc::now(),
        }
    }

    /// Signed effect on the balance
    pub fn balance_delta(&self) -> Decimal {
        self.kind.balance_delta(self.amount)
    }
}
