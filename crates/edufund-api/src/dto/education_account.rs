//! Education account DTOs

use super::common::validate_positive;
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

/// Query parameters of the education account listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountListParams {
    /// `active` or `closed`
    pub status: Option<String>,
}

/// Ad-hoc credit into one account
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TopUpRequest {
    /// Amount to credit
    #[validate(custom(function = "validate_positive"))]
    pub amount: Decimal,

    /// Shown on the holder's statement
    #[validate(length(max = 500))]
    pub description: Option<String>,
}
