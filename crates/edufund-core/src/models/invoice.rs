//! Invoice model
//!
//! An invoice is issued when a holder enrolls in a course and is settled from
//! the education account balance, an external payment, or both.

use super::text_enum;
use super::transaction::{check_money_scale, PaymentMethod};
use crate::error::AppError;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

text_enum! {
    /// Invoice settlement state
    pub enum InvoiceStatus {
        Outstanding => "outstanding",
        Paid => "paid",
        Cancelled => "cancelled",
    }
}

impl InvoiceStatus {
    /// Outstanding is the only state an invoice can leave
    pub fn can_transition_to(&self, next: InvoiceStatus) -> bool {
        matches!(
            (self, next),
            (InvoiceStatus::Outstanding, InvoiceStatus::Paid)
                | (InvoiceStatus::Outstanding, InvoiceStatus::Cancelled)
        )
    }

    /// Check a transition, producing the API error on refusal
    pub fn ensure_transition(&self, next: InvoiceStatus) -> Result<(), AppError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(AppError::transition("invoice", self, next))
        }
    }
}

/// Invoice entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i32,
    pub invoice_number: String,
    pub holder_id: i32,
    pub enrollment_id: i32,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    /// Build the invoice issued for a new enrollment
    pub fn for_enrollment(holder_id: i32, amount: Decimal, due_date: NaiveDate) -> Self {
        Self {
            id: 0,
            invoice_number: String::new(),
            holder_id,
            enrollment_id: 0,
            amount,
            due_date,
            status: InvoiceStatus::Outstanding,
            paid_at: None,
            created_at: Utc::now(),
        }
    }

    /// Format the invoice number for a freshly assigned id
    pub fn format_number(prefix: &str, issued_on: NaiveDate, id: i32) -> String {
        format!("{}-{}-{:06}", prefix, issued_on.format("%Y%m"), id)
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == InvoiceStatus::Outstanding && today > self.due_date
    }
}

/// How a holder wants to settle an invoice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSplit {
    /// Part debited from the education account
    pub balance_amount: Decimal,
    /// Part collected outside the account
    pub external_amount: Decimal,
    pub external_method: Option<PaymentMethod>,
}

impl PaymentSplit {
    /// Settle entirely from the account balance
    pub fn from_balance(amount: Decimal) -> Self {
        Self {
            balance_amount: amount,
            external_amount: Decimal::ZERO,
            external_method: None,
        }
    }

    /// Check the split against the invoice amount
    pub fn validate_for(&self, invoice_amount: Decimal) -> Result<(), AppError> {
        if self.balance_amount < Decimal::ZERO || self.external_amount < Decimal::ZERO {
            return Err(AppError::Validation(
                "payment amounts must not be negative".to_string(),
            ));
        }
        check_money_scale("balance_amount", self.balance_amount)?;
        check_money_scale("external_amount", self.external_amount)?;
        if self.balance_amount + self.external_amount != invoice_amount {
            return Err(AppError::Validation(format!(
                "payment total {} does not match invoice amount {}",
                self.balance_amount + self.external_amount,
                invoice_amount
            )));
        }
        match (self.external_amount > Decimal::ZERO, self.external_method) {
            (true, None) => Err(AppError::MissingField("external_method".to_string())),
            (true, Some(PaymentMethod::AccountBalance)) => Err(AppError::Validation(
                "external_method cannot be account_balance".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_invoice_transitions() {
        assert!(InvoiceStatus::Outstanding.can_transition_to(InvoiceStatus::Paid));
        assert!(InvoiceStatus::Outstanding.can_transition_to(InvoiceStatus::Cancelled));
        assert!(!InvoiceStatus::Paid.can_transition_to(InvoiceStatus::Cancelled));
        assert!(!InvoiceStatus::Cancelled.can_transition_to(InvoiceStatus::Paid));
        assert!(!InvoiceStatus::Paid.can_transition_to(InvoiceStatus::Outstanding));

        let err = InvoiceStatus::Paid
            .ensure_transition(InvoiceStatus::Paid)
            .unwrap_err();
        assert_eq!(err.error_code(), "invalid_status_transition");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(
            Invoice::format_number("INV", date(2026, 10, 19), 42),
            "INV-202610-000042"
        );
    }

    #[test]
    fn test_overdue() {
        let invoice = Invoice::for_enrollment(1, dec!(120.00), date(2026, 10, 1));
        assert!(!invoice.is_overdue(date(2026, 10, 1)));
        assert!(invoice.is_overdue(date(2026, 10, 2)));

        let paid = Invoice {
            status: InvoiceStatus::Paid,
            ..invoice
        };
        assert!(!paid.is_overdue(date(2027, 1, 1)));
    }

    #[test]
    fn test_payment_split_must_match_amount() {
        assert!(PaymentSplit::from_balance(dec!(100.00))
            .validate_for(dec!(100.00))
            .is_ok());
        assert!(PaymentSplit::from_balance(dec!(99.99))
            .validate_for(dec!(100.00))
            .is_err());

        let split = PaymentSplit {
            balance_amount: dec!(60.00),
            external_amount: dec!(40.00),
            external_method: Some(PaymentMethod::Card),
        };
        assert!(split.validate_for(dec!(100.00)).is_ok());
    }

    #[test]
    fn test_payment_split_external_needs_method() {
        let split = PaymentSplit {
            balance_amount: dec!(60.00),
            external_amount: dec!(40.00),
            external_method: None,
        };
        assert!(matches!(
            split.validate_for(dec!(100.00)),
            Err(AppError::MissingField(_))
        ));

        let split = PaymentSplit {
            balance_amount: dec!(-10.00),
            external_amount: dec!(110.00),
            external_method: Some(PaymentMethod::BankTransfer),
        };
        assert!(split.validate_for(dec!(100.00)).is_err());
    }

    #[test]
    fn test_payment_split_rejects_fractions_of_a_cent() {
        // Sums to the invoice amount but neither part is a whole cent
        let split = PaymentSplit {
            balance_amount: dec!(99.995),
            external_amount: dec!(0.005),
            external_method: Some(PaymentMethod::Card),
        };
        assert!(matches!(
            split.validate_for(dec!(100.00)),
            Err(AppError::Validation(_))
        ));
    }
}
