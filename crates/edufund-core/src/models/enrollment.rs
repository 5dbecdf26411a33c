//! Enrollment model

use super::text_enum;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

text_enum! {
    /// Enrollment lifecycle
    pub enum EnrollmentStatus {
        Active => "active",
        Completed => "completed",
        Withdrawn => "withdrawn",
    }
}

impl EnrollmentStatus {
    /// Only active enrollments can move, and only forward
    pub fn can_transition_to(&self, next: EnrollmentStatus) -> bool {
        matches!(
            (self, next),
            (EnrollmentStatus::Active, EnrollmentStatus::Completed)
                | (EnrollmentStatus::Active, EnrollmentStatus::Withdrawn)
        )
    }
}

/// A holder's enrollment in a course
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: i32,
    pub holder_id: i32,
    pub course_id: i32,
    pub status: EnrollmentStatus,
    pub enrolled_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Enrollment {
    pub fn new(holder_id: i32, course_id: i32) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            holder_id,
            course_id,
            status: EnrollmentStatus::Active,
            enrolled_at: now,
            updated_at: now,
        }
    }
}

/// Enrollment joined with the course columns shown in listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentDetail {
    pub enrollment: Enrollment,
    pub course_code: String,
    pub course_name: String,
    pub provider: String,
    pub fee: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enrollment_transitions() {
        assert!(EnrollmentStatus::Active.can_transition_to(EnrollmentStatus::Withdrawn));
        assert!(EnrollmentStatus::Active.can_transition_to(EnrollmentStatus::Completed));
        assert!(!EnrollmentStatus::Withdrawn.can_transition_to(EnrollmentStatus::Active));
        assert!(!EnrollmentStatus::Completed.can_transition_to(EnrollmentStatus::Withdrawn));
    }

    #[test]
    fn test_new_enrollment_is_active() {
        let enrollment = Enrollment::new(7, 3);
        assert_eq!(enrollment.status, EnrollmentStatus::Active);
        assert_eq!(enrollment.holder_id, 7);
        assert_eq!(enrollment.course_id, 3);
    }
}
