//! Course model

use super::text_enum;
use super::transaction::MONEY_SCALE;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

text_enum! {
    /// Whether a course accepts new enrollments
    pub enum CourseStatus {
        Active => "active",
        Inactive => "inactive",
    }
}

/// Course offered by an approved provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: i32,

    /// Unique course code, stored upper-case
    pub course_code: String,

    pub name: String,

    pub provider: String,

    pub description: Option<String>,

    /// Fee invoiced on enrollment
    pub fee: Decimal,

    pub start_date: NaiveDate,

    pub end_date: NaiveDate,

    pub status: CourseStatus,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Course {
    /// Check if new enrollments are accepted on `today`
    pub fn is_open_for_enrollment(&self, today: NaiveDate) -> bool {
        self.status == CourseStatus::Active && today <= self.end_date
    }

    /// Check the course's own invariants
    pub fn validate_schedule(&self) -> Result<(), String> {
        if self.end_date < self.start_date {
            return Err(format!(
                "end_date {} is before start_date {}",
                self.end_date, self.start_date
            ));
        }
        if self.fee < Decimal::ZERO {
            return Err("fee must not be negative".to_string());
        }
        if self.fee.normalize().scale() > MONEY_SCALE {
            return Err(format!("fee must have at most {} decimal places", MONEY_SCALE));
        }
        Ok(())
    }
}

impl Default for Course {
    fn default() -> Self {
        let now = Utc::now();
        let today = now.date_naive();
        Self {
            id: 0,
            course_code: String::new(),
            name: String::new(),
            provider: String::new(),
            description: None,
            fee: Decimal::ZERO,
            start_date: today,
            end_date: today,
            status: CourseStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }
}
