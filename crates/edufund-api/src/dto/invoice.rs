//! Invoice DTOs

use super::common::{parse_param, validate_not_negative, PaginationParams};
use chrono::NaiveDate;
use edufund_core::models::{Invoice, PaymentMethod, PaymentSplit, Transaction};
use edufund_core::query::InvoiceQuery;
use edufund_core::AppResult;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Query parameters of the invoice listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceListParams {
    /// Only invoices of this holder
    pub holder_id: Option<String>,
    /// Only invoices of this enrollment
    pub enrollment_id: Option<String>,
    /// `outstanding`, `paid` or `cancelled`
    pub status: Option<String>,
    /// `true` keeps only invoices whose due date has passed
    pub overdue: Option<String>,
}

impl InvoiceListParams {
    /// Typed listing query; overdue means due before `today`
    pub fn to_query(&self, pagination: &PaginationParams, today: NaiveDate) -> AppResult<InvoiceQuery> {
        let overdue: Option<bool> = parse_param("overdue", self.overdue.as_deref())?;
        Ok(InvoiceQuery {
            holder_id: parse_param("holder_id", self.holder_id.as_deref())?,
            enrollment_id: parse_param("enrollment_id", self.enrollment_id.as_deref())?,
            status: parse_param("status", self.status.as_deref())?,
            due_before: overdue.unwrap_or(false).then_some(today),
            pagination: pagination.pagination(),
        })
    }
}

/// How a holder settles an invoice
///
/// The two amounts must add up to the invoice amount exactly.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PayInvoiceRequest {
    /// Part debited from the education account
    #[serde(default)]
    #[validate(custom(function = "validate_not_negative"))]
    pub balance_amount: Decimal,

    /// Part collected outside the account
    #[serde(default)]
    #[validate(custom(function = "validate_not_negative"))]
    pub external_amount: Decimal,

    /// How the external part was collected
    pub external_method: Option<PaymentMethod>,
}

impl From<PayInvoiceRequest> for PaymentSplit {
    fn from(req: PayInvoiceRequest) -> Self {
        PaymentSplit {
            balance_amount: req.balance_amount,
            external_amount: req.external_amount,
            external_method: req.external_method,
        }
    }
}

/// Paid invoice and the ledger entries it produced
#[derive(Debug, Clone, Serialize)]
pub struct PaymentResponse {
    /// Invoice after payment
    pub invoice: Invoice,
    /// One entry per non-zero part of the split
    pub transactions: Vec<Transaction>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use edufund_core::models::InvoiceStatus;
    use rust_decimal_macros::dec;

    #[test]
    fn test_pay_request_defaults_missing_parts_to_zero() {
        let req: PayInvoiceRequest =
            serde_json::from_str(r#"{"external_amount": "80.00", "external_method": "card"}"#).unwrap();
        assert!(req.validate().is_ok());

        let split = PaymentSplit::from(req);
        assert_eq!(split.balance_amount, dec!(0));
        assert_eq!(split.external_method, Some(PaymentMethod::Card));
    }

    #[test]
    fn test_pay_request_rejects_negative_part() {
        let req = PayInvoiceRequest {
            balance_amount: dec!(-5),
            external_amount: dec!(105),
            external_method: Some(PaymentMethod::BankTransfer),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_overdue_filter() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let params = InvoiceListParams {
            status: Some("outstanding".to_string()),
            overdue: Some("true".to_string()),
            ..Default::default()
        };
        let query = params.to_query(&PaginationParams::default(), today).unwrap();
        assert_eq!(query.status, Some(InvoiceStatus::Outstanding));
        assert_eq!(query.due_before, Some(today));

        let params = InvoiceListParams {
            holder_id: Some("abc".to_string()),
            ..Default::default()
        };
        assert!(params.to_query(&PaginationParams::default(), today).is_err());
    }
}
