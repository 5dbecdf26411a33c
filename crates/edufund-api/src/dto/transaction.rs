//! Transaction DTOs

use super::common::{parse_param, PaginationParams};
use edufund_core::query::TransactionQuery;
use edufund_core::AppResult;
use serde::Deserialize;

/// Query parameters of the transaction ledger
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionListParams {
    /// Only entries of this account
    pub account_id: Option<String>,
    /// `top_up`, `course_payment` or `external_payment`
    pub kind: Option<String>,
    /// `pending`, `completed` or `failed`
    pub status: Option<String>,
    /// Inclusive start date (YYYY-MM-DD)
    pub from: Option<String>,
    /// Inclusive end date (YYYY-MM-DD)
    pub to: Option<String>,
}

impl TransactionListParams {
    /// Typed listing query
    pub fn to_query(&self, pagination: &PaginationParams) -> AppResult<TransactionQuery> {
        Ok(TransactionQuery {
            account_id: parse_param("account_id", self.account_id.as_deref())?,
            kind: parse_param("kind", self.kind.as_deref())?,
            status: parse_param("status", self.status.as_deref())?,
            from: parse_param("from", self.from.as_deref())?,
            to: parse_param("to", self.to.as_deref())?,
            pagination: pagination.pagination(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use edufund_core::models::TransactionKind;

    #[test]
    fn test_to_query() {
        let params = TransactionListParams {
            kind: Some("top_up".to_string()),
            from: Some("2024-01-01".to_string()),
            ..Default::default()
        };
        let query = params.to_query(&PaginationParams::default()).unwrap();
        assert_eq!(query.kind, Some(TransactionKind::TopUp));
        assert_eq!(query.from, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert!(query.account_id.is_none());

        let params = TransactionListParams {
            to: Some("01/02/2024".to_string()),
            ..Default::default()
        };
        assert!(params.to_query(&PaginationParams::default()).is_err());
    }
}
