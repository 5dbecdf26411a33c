//! Wire-format checks for request and response bodies

use chrono::NaiveDate;
use edufund_api::dto::{
    AccountHolderListParams, ApiResponse, PaginationParams, PayInvoiceRequest,
    TopUpRuleUpdateRequest,
};
use edufund_core::models::{PaymentMethod, PaymentSplit};
use edufund_core::traits::{PaginatedResponse, Pagination};
use edufund_services::TopUpRuleChanges;
use rust_decimal_macros::dec;
use serde_json::json;
use validator::Validate;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 9, 1).unwrap()
}

#[test]
fn test_paginated_envelope() {
    let page = PaginatedResponse::new(vec![1, 2, 3], 53, Pagination::new(2, 25));
    let value = serde_json::to_value(&page).unwrap();

    assert_eq!(value["data"], json!([1, 2, 3]));
    assert_eq!(value["pagination"]["total"], 53);
    assert_eq!(value["pagination"]["page"], 2);
    assert_eq!(value["pagination"]["per_page"], 25);
    assert_eq!(value["pagination"]["total_pages"], 3);
}

#[test]
fn test_message_omitted_when_absent() {
    let plain = serde_json::to_value(ApiResponse::success("ok")).unwrap();
    assert!(plain.get("message").is_none());

    let with = serde_json::to_value(ApiResponse::with_message("ok", "Done")).unwrap();
    assert_eq!(with["message"], "Done");
}

#[test]
fn test_pagination_params_from_query_strings() {
    let params: PaginationParams = serde_json::from_value(json!({
        "page": "0",
        "per_page": "5000"
    }))
    .unwrap();
    let pagination = params.pagination();
    assert_eq!(pagination.page, 1);
    assert_eq!(pagination.per_page, 1000);
}

#[test]
fn test_holder_filters_reject_inverted_ranges_later() {
    // Parsing accepts both bounds; the service rejects min > max
    let params = AccountHolderListParams {
        min_age: Some("40".to_string()),
        max_age: Some("20".to_string()),
        ..Default::default()
    };
    let query = params.to_query(&PaginationParams::default(), today()).unwrap();
    assert!(query.filter.validate().is_err());
}

#[test]
fn test_split_payment_body() {
    let req: PayInvoiceRequest = serde_json::from_value(json!({
        "balance_amount": "120.00",
        "external_amount": 30.5,
        "external_method": "card"
    }))
    .unwrap();
    assert!(req.validate().is_ok());

    let split = PaymentSplit::from(req);
    assert_eq!(split.balance_amount, dec!(120.00));
    assert_eq!(split.external_amount, dec!(30.5));
    assert_eq!(split.external_method, Some(PaymentMethod::Card));
}

#[test]
fn test_rule_edit_null_clears_criterion() {
    let req: TopUpRuleUpdateRequest = serde_json::from_value(json!({
        "max_age": null,
        "amount": "250"
    }))
    .unwrap();
    let changes = TopUpRuleChanges::from(req);

    assert_eq!(changes.max_age, Some(None));
    assert_eq!(changes.min_age, None);
    assert_eq!(changes.amount, Some(dec!(250)));
}

#[test]
fn test_huge_page_number_keeps_offset_in_range() {
    let params: PaginationParams = serde_json::from_value(json!({
        "page": "9223372036854775807",
        "per_page": "1000"
    }))
    .unwrap();
    let pagination = params.pagination();
    assert_eq!(pagination.offset(), i64::MAX);
}

#[test]
fn test_holder_filter_age_above_limit_rejected() {
    let params = AccountHolderListParams {
        max_age: Some("4294967295".to_string()),
        ..Default::default()
    };
    let query = params.to_query(&PaginationParams::default(), today()).unwrap();
    assert!(query.filter.validate().is_err());
}

#[test]
fn test_split_payment_in_fractions_of_a_cent_rejected() {
    let req: PayInvoiceRequest = serde_json::from_value(json!({
        "balance_amount": "99.995",
        "external_amount": "0.005",
        "external_method": "card"
    }))
    .unwrap();
    assert!(req.validate().is_err());
}
