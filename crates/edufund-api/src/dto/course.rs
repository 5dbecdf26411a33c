//! Course DTOs

use super::common::{parse_param, validate_not_negative, PaginationParams};
use chrono::NaiveDate;
use edufund_core::models::{Course, CourseStatus};
use edufund_core::query::CourseQuery;
use edufund_core::AppResult;
use edufund_services::CourseChanges;
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

/// Query parameters of the course listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseListParams {
    /// `active` or `inactive`
    pub status: Option<String>,
    /// Provider name fragment
    pub provider: Option<String>,
    /// Course code or name fragment
    pub search: Option<String>,
}

impl CourseListParams {
    /// Typed listing query
    pub fn to_query(&self, pagination: &PaginationParams) -> AppResult<CourseQuery> {
        Ok(CourseQuery {
            status: parse_param("status", self.status.as_deref())?,
            provider: self.provider.clone().filter(|p| !p.trim().is_empty()),
            search: self.search.clone().filter(|s| !s.trim().is_empty()),
            pagination: pagination.pagination(),
        })
    }
}

/// Request to add a course
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CourseCreateRequest {
    /// Unique course code
    #[validate(length(min = 1, max = 30, message = "Course code is required"))]
    pub course_code: String,

    /// Course name
    #[validate(length(min = 1, max = 200, message = "Course name is required"))]
    pub name: String,

    /// Institution offering the course
    #[validate(length(min = 1, max = 200, message = "Provider is required"))]
    pub provider: String,

    /// Free-text description
    #[validate(length(max = 2000))]
    pub description: Option<String>,

    /// Fee invoiced on enrollment
    #[validate(custom(function = "validate_not_negative"))]
    pub fee: Decimal,

    /// First day of the course
    pub start_date: NaiveDate,

    /// Last day of the course
    pub end_date: NaiveDate,

    /// Defaults to `active`
    #[serde(default = "default_status")]
    pub status: CourseStatus,
}

fn default_status() -> CourseStatus {
    CourseStatus::Active
}

impl CourseCreateRequest {
    /// Course entity without an id
    pub fn to_course(&self) -> Course {
        Course {
            course_code: self.course_code.clone(),
            name: self.name.clone(),
            provider: self.provider.clone(),
            description: self.description.clone(),
            fee: self.fee,
            start_date: self.start_date,
            end_date: self.end_date,
            status: self.status,
            ..Default::default()
        }
    }
}

/// Partial course update; omitted fields are left alone
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CourseUpdateRequest {
    /// New course name
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,

    /// New provider
    #[validate(length(min = 1, max = 200))]
    pub provider: Option<String>,

    /// New description
    #[validate(length(max = 2000))]
    pub description: Option<String>,

    /// New fee; existing invoices keep the old amount
    #[validate(custom(function = "validate_not_negative"))]
    pub fee: Option<Decimal>,

    /// New first day
    pub start_date: Option<NaiveDate>,

    /// New last day
    pub end_date: Option<NaiveDate>,

    /// `active` or `inactive`
    pub status: Option<CourseStatus>,
}

impl From<CourseUpdateRequest> for CourseChanges {
    fn from(req: CourseUpdateRequest) -> Self {
        CourseChanges {
            name: req.name,
            provider: req.provider,
            description: req.description,
            fee: req.fee,
            start_date: req.start_date,
            end_date: req.end_date,
            status: req.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_create_request_defaults_to_active() {
        let req: CourseCreateRequest = serde_json::from_str(
            r#"{
                "course_code": "DIP-ICT",
                "name": "Diploma in ICT",
                "provider": "Nanyang Polytechnic",
                "fee": "1200.00",
                "start_date": "2024-07-01",
                "end_date": "2025-06-30"
            }"#,
        )
        .unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.status, CourseStatus::Active);
        assert_eq!(req.to_course().fee, dec!(1200.00));
    }

    #[test]
    fn test_negative_fee_rejected() {
        let req = CourseUpdateRequest {
            fee: Some(dec!(-1)),
            ..Default::default()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_list_params() {
        let params = CourseListParams {
            status: Some("inactive".to_string()),
            provider: Some(" ".to_string()),
            search: None,
        };
        let query = params.to_query(&PaginationParams::default()).unwrap();
        assert_eq!(query.status, Some(CourseStatus::Inactive));
        assert!(query.provider.is_none());
    }
}
