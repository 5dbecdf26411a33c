//! Enrollment DTOs

use edufund_core::models::{Enrollment, Invoice};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to enroll a holder in a course
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EnrollRequest {
    /// Holder to enroll
    #[validate(range(min = 1))]
    pub holder_id: i32,

    /// Course to enroll in
    #[validate(range(min = 1))]
    pub course_id: i32,
}

/// Enrollment with the invoice issued for it
#[derive(Debug, Clone, Serialize)]
pub struct EnrollmentCreated {
    /// New active enrollment
    pub enrollment: Enrollment,
    /// Course-fee invoice issued with it
    pub invoice: Invoice,
}
