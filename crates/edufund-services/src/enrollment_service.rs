//! Enrollment service
//!
//! Enrolling issues the course-fee invoice in the same unit of work;
//! withdrawing cancels whatever is still outstanding.

use chrono::{Duration, NaiveDate};
use edufund_core::{
    models::{Course, Enrollment, EnrollmentDetail, EnrollmentStatus, Invoice},
    traits::{
        AccountHolderRepository, CourseRepository, EducationAccountRepository,
        EnrollmentRepository,
    },
    AppError, AppResult,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Enrollment lifecycle and fee invoicing
pub struct EnrollmentService {
    enrollments: Arc<dyn EnrollmentRepository>,
    courses: Arc<dyn CourseRepository>,
    holders: Arc<dyn AccountHolderRepository>,
    accounts: Arc<dyn EducationAccountRepository>,
    payment_terms_days: i64,
    invoice_prefix: String,
}

impl EnrollmentService {
    pub fn new(
        enrollments: Arc<dyn EnrollmentRepository>,
        courses: Arc<dyn CourseRepository>,
        holders: Arc<dyn AccountHolderRepository>,
        accounts: Arc<dyn EducationAccountRepository>,
        payment_terms_days: i64,
        invoice_prefix: impl Into<String>,
    ) -> Self {
        Self {
            enrollments,
            courses,
            holders,
            accounts,
            payment_terms_days,
            invoice_prefix: invoice_prefix.into(),
        }
    }

    pub async fn get(&self, id: i32) -> AppResult<Enrollment> {
        self.enrollments
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::EnrollmentNotFound(id.to_string()))
    }

    pub async fn list_for_holder(&self, holder_id: i32) -> AppResult<Vec<EnrollmentDetail>> {
        self.enrollments.list_by_holder(holder_id).await
    }

    /// Enroll a holder and invoice the course fee
    #[instrument(skip(self))]
    pub async fn enroll(
        &self,
        holder_id: i32,
        course_id: i32,
        today: NaiveDate,
    ) -> AppResult<(Enrollment, Invoice)> {
        self.holders
            .find_by_id(holder_id)
            .await?
            .ok_or_else(|| AppError::AccountHolderNotFound(holder_id.to_string()))?;

        let course: Course = self
            .courses
            .find_by_id(course_id)
            .await?
            .ok_or_else(|| AppError::CourseNotFound(course_id.to_string()))?;
        if !course.is_open_for_enrollment(today) {
            return Err(AppError::CourseInactive(course.course_code));
        }

        let account = self
            .accounts
            .find_by_holder(holder_id)
            .await?
            .ok_or_else(|| {
                AppError::EducationAccountNotFound(format!("for holder {}", holder_id))
            })?;
        if !account.can_transact() {
            warn!(account_number = %account.account_number, "Enrollment refused on closed account");
            return Err(AppError::AccountClosed(account.account_number));
        }

        if self
            .enrollments
            .find_active(holder_id, course_id)
            .await?
            .is_some()
        {
            return Err(AppError::AlreadyEnrolled(format!(
                "Holder {} is already enrolled in {}",
                holder_id, course.course_code
            )));
        }

        let due_date = today + Duration::days(self.payment_terms_days);
        let invoice = Invoice::for_enrollment(holder_id, course.fee, due_date);
        let (enrollment, invoice) = self
            .enrollments
            .enroll(
                &Enrollment::new(holder_id, course_id),
                &invoice,
                &self.invoice_prefix,
            )
            .await?;

        info!(
            enrollment_id = enrollment.id,
            invoice = %invoice.invoice_number,
            amount = %invoice.amount,
            "Holder enrolled"
        );
        Ok((enrollment, invoice))
    }

    /// Withdraw an active enrollment, cancelling its outstanding invoices
    pub async fn withdraw(&self, id: i32) -> AppResult<Enrollment> {
        self.move_to(id, EnrollmentStatus::Withdrawn).await
    }

    pub async fn complete(&self, id: i32) -> AppResult<Enrollment> {
        self.move_to(id, EnrollmentStatus::Completed).await
    }

    #[instrument(skip(self))]
    async fn move_to(&self, id: i32, to: EnrollmentStatus) -> AppResult<Enrollment> {
        let current = self.get(id).await?;
        let updated = self
            .enrollments
            .set_status(id, current.status, to)
            .await?
            .ok_or_else(|| AppError::transition("enrollment", current.status, to))?;

        info!(enrollment_id = id, status = %updated.status, "Enrollment status changed");
        Ok(updated)
    }
}
