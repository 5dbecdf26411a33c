//! Top-up rule DTOs

use super::common::validate_positive;
use chrono::NaiveDate;
use edufund_core::models::{EducationLevel, ResidentialStatus, SchoolingStatus, TopUpRule};
use edufund_services::TopUpRuleChanges;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use validator::Validate;

/// Query parameters of the top-up rule listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopUpRuleListParams {
    /// `scheduled`, `executed` or `cancelled`
    pub status: Option<String>,
}

/// Request to schedule a top-up rule
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TopUpRuleCreateRequest {
    /// Rule name
    #[validate(length(min = 1, max = 200, message = "Rule name is required"))]
    pub name: String,

    /// Free-text description
    #[validate(length(max = 2000))]
    pub description: Option<String>,

    /// Amount credited to each eligible account
    #[validate(custom(function = "validate_positive"))]
    pub amount: Decimal,

    /// Youngest eligible age, inclusive
    #[validate(range(max = 150))]
    pub min_age: Option<u32>,

    /// Oldest eligible age, inclusive
    #[validate(range(max = 150))]
    pub max_age: Option<u32>,

    /// Only holders with this residency
    pub residential_status: Option<ResidentialStatus>,

    /// Only holders with this schooling status
    pub schooling_status: Option<SchoolingStatus>,

    /// Only holders at this education level
    pub education_level: Option<EducationLevel>,

    /// Day the rule becomes due
    pub scheduled_date: NaiveDate,
}

impl TopUpRuleCreateRequest {
    /// Rule entity in `scheduled` state
    pub fn to_rule(&self) -> TopUpRule {
        TopUpRule {
            name: self.name.clone(),
            description: self.description.clone(),
            amount: self.amount,
            min_age: self.min_age,
            max_age: self.max_age,
            residential_status: self.residential_status,
            schooling_status: self.schooling_status,
            education_level: self.education_level,
            scheduled_date: self.scheduled_date,
            ..Default::default()
        }
    }
}

/// Distinguish an absent field from an explicit `null`
fn explicit_null<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Edit of a scheduled rule
///
/// Criteria sent as `null` are removed; omitted fields are left alone.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct TopUpRuleUpdateRequest {
    /// New rule name
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,

    /// New description
    #[validate(length(max = 2000))]
    pub description: Option<String>,

    /// New amount
    #[validate(custom(function = "validate_positive"))]
    pub amount: Option<Decimal>,

    /// Youngest eligible age; `null` removes it
    #[serde(default, deserialize_with = "explicit_null")]
    pub min_age: Option<Option<u32>>,

    /// Oldest eligible age; `null` removes it
    #[serde(default, deserialize_with = "explicit_null")]
    pub max_age: Option<Option<u32>>,

    /// Residency criterion; `null` removes it
    #[serde(default, deserialize_with = "explicit_null")]
    pub residential_status: Option<Option<ResidentialStatus>>,

    /// Schooling criterion; `null` removes it
    #[serde(default, deserialize_with = "explicit_null")]
    pub schooling_status: Option<Option<SchoolingStatus>>,

    /// Education level criterion; `null` removes it
    #[serde(default, deserialize_with = "explicit_null")]
    pub education_level: Option<Option<EducationLevel>>,

    /// New due date
    pub scheduled_date: Option<NaiveDate>,
}

impl From<TopUpRuleUpdateRequest> for TopUpRuleChanges {
    fn from(req: TopUpRuleUpdateRequest) -> Self {
        TopUpRuleChanges {
            name: req.name,
            description: req.description,
            amount: req.amount,
            min_age: req.min_age,
            max_age: req.max_age,
            residential_status: req.residential_status,
            schooling_status: req.schooling_status,
            education_level: req.education_level,
            scheduled_date: req.scheduled_date,
        }
    }
}
