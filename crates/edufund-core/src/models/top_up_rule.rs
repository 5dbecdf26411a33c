//! Top-up rule model
//!
//! A top-up rule credits a fixed amount into every active education account
//! whose holder matches the rule's eligibility criteria on the day it runs.

use super::account_holder::{
    check_age_bound, AccountHolder, EducationLevel, ResidentialStatus, SchoolingStatus,
};
use super::text_enum;
use super::transaction::check_money_scale;
use crate::error::AppError;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

text_enum! {
    /// Rule lifecycle
    pub enum TopUpRuleStatus {
        Scheduled => "scheduled",
        Executed => "executed",
        Cancelled => "cancelled",
    }
}

impl TopUpRuleStatus {
    pub fn can_transition_to(&self, next: TopUpRuleStatus) -> bool {
        matches!(
            (self, next),
            (TopUpRuleStatus::Scheduled, TopUpRuleStatus::Executed)
                | (TopUpRuleStatus::Scheduled, TopUpRuleStatus::Cancelled)
        )
    }
}

/// Top-up rule entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopUpRule {
    pub id: i32,

    pub name: String,

    pub description: Option<String>,

    /// Amount credited to each eligible account
    pub amount: Decimal,

    /// Inclusive lower age bound
    pub min_age: Option<u32>,

    /// Inclusive upper age bound
    pub max_age: Option<u32>,

    pub residential_status: Option<ResidentialStatus>,

    pub schooling_status: Option<SchoolingStatus>,

    pub education_level: Option<EducationLevel>,

    /// Day on or after which the scheduler executes the rule
    pub scheduled_date: NaiveDate,

    pub status: TopUpRuleStatus,

    pub executed_at: Option<DateTime<Utc>>,

    pub created_by: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl TopUpRule {
    /// Check whether `holder` is eligible when the rule runs on `on`
    pub fn matches(&self, holder: &AccountHolder, on: NaiveDate) -> bool {
        let age = holder.age_on(on);

        if self.min_age.is_some_and(|min| age < min) {
            return false;
        }
        if self.max_age.is_some_and(|max| age > max) {
            return false;
        }
        if self
            .residential_status
            .is_some_and(|s| s != holder.residential_status)
        {
            return false;
        }
        if self
            .schooling_status
            .is_some_and(|s| s != holder.schooling_status)
        {
            return false;
        }
        if self
            .education_level
            .is_some_and(|l| l != holder.education_level)
        {
            return false;
        }
        true
    }

    /// Check if the scheduler should run this rule on `today`
    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.status == TopUpRuleStatus::Scheduled && self.scheduled_date <= today
    }

    /// Check the rule's own invariants
    pub fn validate(&self) -> Result<(), AppError> {
        if self.amount <= Decimal::ZERO {
            return Err(AppError::Validation(
                "top-up amount must be positive".to_string(),
            ));
        }
        check_money_scale("amount", self.amount)?;
        check_age_bound("min_age", self.min_age)?;
        check_age_bound("max_age", self.max_age)?;
        if let (Some(min), Some(max)) = (self.min_age, self.max_age) {
            if min > max {
                return Err(AppError::Validation(format!(
                    "min_age {} is greater than max_age {}",
                    min, max
                )));
            }
        }
        Ok(())
    }
}

impl Default for TopUpRule {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            name: String::new(),
            description: None,
            amount: Decimal::ZERO,
            min_age: None,
            max_age: None,
            residential_status: None,
            schooling_status: None,
            education_level: None,
            scheduled_date: now.date_naive(),
            status: TopUpRuleStatus::Scheduled,
            executed_at: None,
            created_by: String::new(),
            created_at: now,
            updated_at: now,
        }
    }
}
