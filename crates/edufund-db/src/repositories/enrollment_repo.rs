//! Enrollment repository implementation
//!
//! Enrolling writes the enrollment and its invoice together; withdrawing
//! cancels whatever is still outstanding on the enrollment.

use super::invoice_repo::{InvoiceRow, INVOICE_COLUMNS};
use super::{is_unique_violation, parse_column, tx_error};
use edufund_core::{
    models::{Enrollment, EnrollmentDetail, EnrollmentStatus, Invoice},
    traits::EnrollmentRepository,
    AppError, AppResult,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres};
use tracing::{debug, error, info, instrument};

const ENROLLMENT_COLUMNS: &str = "id, holder_id, course_id, status, enrolled_at, updated_at";

/// PostgreSQL implementation of EnrollmentRepository
pub struct PgEnrollmentRepository {
    pool: PgPool,
}

impl PgEnrollmentRepository {
    /// Create a new enrollment repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EnrollmentRepository for PgEnrollmentRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Enrollment>> {
        debug!("Finding enrollment by id: {}", id);

        let row = sqlx::query_as::<Postgres, EnrollmentRow>(&format!(
            "SELECT {} FROM enrollments WHERE id = $1",
            ENROLLMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding enrollment {}: {}", id, e);
            AppError::Database(format!("Failed to find enrollment: {}", e))
        })?;

        row.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self))]
    async fn list_by_holder(&self, holder_id: i32) -> AppResult<Vec<EnrollmentDetail>> {
        debug!("Listing enrollments of holder {}", holder_id);

        let rows = sqlx::query_as::<Postgres, EnrollmentDetailRow>(
            r#"
            SELECT
                e.id, e.holder_id, e.course_id, e.status, e.enrolled_at, e.updated_at,
                c.course_code, c.name AS course_name, c.provider, c.fee,
                c.start_date, c.end_date
            FROM enrollments e
            JOIN courses c ON c.id = e.course_id
            WHERE e.holder_id = $1
            ORDER BY e.enrolled_at DESC, e.id DESC
            "#,
        )
        .bind(holder_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error listing enrollments of {}: {}", holder_id, e);
            AppError::Database(format!("Failed to fetch enrollments: {}", e))
        })?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    #[instrument(skip(self))]
    async fn find_active(&self, holder_id: i32, course_id: i32) -> AppResult<Option<Enrollment>> {
        let row = sqlx::query_as::<Postgres, EnrollmentRow>(&format!(
            r#"
            SELECT {} FROM enrollments
            WHERE holder_id = $1 AND course_id = $2 AND status = 'active'
            "#,
            ENROLLMENT_COLUMNS
        ))
        .bind(holder_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding active enrollment: {}", e);
            AppError::Database(format!("Failed to find enrollment: {}", e))
        })?;

        row.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self, enrollment, invoice), fields(holder_id = enrollment.holder_id, course_id = enrollment.course_id))]
    async fn enroll(
        &self,
        enrollment: &Enrollment,
        invoice: &Invoice,
        invoice_prefix: &str,
    ) -> AppResult<(Enrollment, Invoice)> {
        let mut tx = self.pool.begin().await.map_err(|e| tx_error("begin", e))?;

        let enrollment_row = sqlx::query_as::<Postgres, EnrollmentRow>(&format!(
            r#"
            INSERT INTO enrollments (holder_id, course_id, status)
            VALUES ($1, $2, 'active')
            RETURNING {}
            "#,
            ENROLLMENT_COLUMNS
        ))
        .bind(enrollment.holder_id)
        .bind(enrollment.course_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            error!("Database error creating enrollment: {}", e);
            if is_unique_violation(&e) {
                AppError::AlreadyEnrolled(format!(
                    "Holder {} is already enrolled in course {}",
                    enrollment.holder_id, enrollment.course_id
                ))
            } else {
                AppError::Database(format!("Failed to create enrollment: {}", e))
            }
        })?;

        let invoice_id: i64 =
            sqlx::query_scalar("SELECT nextval(pg_get_serial_sequence('invoices', 'id'))")
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| {
                    error!("Database error allocating invoice id: {}", e);
                    AppError::Database(format!("Failed to allocate invoice id: {}", e))
                })?;
        let invoice_id = i32::try_from(invoice_id)
            .map_err(|_| AppError::Internal("Invoice id out of range".to_string()))?;

        let invoice_row = sqlx::query_as::<Postgres, InvoiceRow>(&format!(
            r#"
            INSERT INTO invoices (
                id, invoice_number, holder_id, enrollment_id, amount, due_date, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, 'outstanding')
            RETURNING {}
            "#,
            INVOICE_COLUMNS
        ))
        .bind(invoice_id)
        .bind(Invoice::format_number(
            invoice_prefix,
            invoice.created_at.date_naive(),
            invoice_id,
        ))
        .bind(invoice.holder_id)
        .bind(enrollment_row.id)
        .bind(invoice.amount)
        .bind(invoice.due_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            error!("Database error issuing invoice: {}", e);
            AppError::Database(format!("Failed to issue invoice: {}", e))
        })?;

        tx.commit().await.map_err(|e| tx_error("commit", e))?;

        let enrollment: Enrollment = enrollment_row.try_into()?;
        let invoice: Invoice = invoice_row.try_into()?;
        info!(
            enrollment_id = enrollment.id,
            invoice = %invoice.invoice_number,
            "Enrollment created"
        );

        Ok((enrollment, invoice))
    }

    #[instrument(skip(self))]
    async fn set_status(
        &self,
        id: i32,
        from: EnrollmentStatus,
        to: EnrollmentStatus,
    ) -> AppResult<Option<Enrollment>> {
        if !from.can_transition_to(to) {
            return Err(AppError::transition("enrollment", from, to));
        }

        let mut tx = self.pool.begin().await.map_err(|e| tx_error("begin", e))?;

        let row = sqlx::query_as::<Postgres, EnrollmentRow>(&format!(
            r#"
            UPDATE enrollments
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {}
            "#,
            ENROLLMENT_COLUMNS
        ))
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            error!("Database error updating enrollment {}: {}", id, e);
            AppError::Database(format!("Failed to update enrollment: {}", e))
        })?;

        let Some(row) = row else {
            return Ok(None);
        };

        if to == EnrollmentStatus::Withdrawn {
            let cancelled = sqlx::query(
                r#"
                UPDATE invoices
                SET status = 'cancelled'
                WHERE enrollment_id = $1 AND status = 'outstanding'
                "#,
            )
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("Database error cancelling invoices of enrollment {}: {}", id, e);
                AppError::Database(format!("Failed to cancel invoices: {}", e))
            })?;
            debug!(
                "Cancelled {} outstanding invoices of enrollment {}",
                cancelled.rows_affected(),
                id
            );
        }

        tx.commit().await.map_err(|e| tx_error("commit", e))?;

        row.try_into().map(Some)
    }

    #[instrument(skip(self))]
    async fn count_active_by_course(&self, course_id: i32) -> AppResult<i64> {
        let result: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM enrollments WHERE course_id = $1 AND status = 'active'",
        )
        .bind(course_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error counting enrollments of course {}: {}", course_id, e);
            AppError::Database(format!("Failed to count enrollments: {}", e))
        })?;

        Ok(result.0)
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct EnrollmentRow {
    id: i32,
    holder_id: i32,
    course_id: i32,
    status: String,
    enrolled_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EnrollmentRow> for Enrollment {
    type Error = AppError;

    fn try_from(row: EnrollmentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            holder_id: row.holder_id,
            course_id: row.course_id,
            status: parse_column("status", &row.status)?,
            enrolled_at: row.enrolled_at,
            updated_at: row.updated_at,
        })
    }
}

/// Enrollment joined with its course
#[derive(Debug, sqlx::FromRow)]
struct EnrollmentDetailRow {
    #[sqlx(flatten)]
    enrollment: EnrollmentRow,
    course_code: String,
    course_name: String,
    provider: String,
    fee: Decimal,
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl TryFrom<EnrollmentDetailRow> for EnrollmentDetail {
    type Error = AppError;

    fn try_from(row: EnrollmentDetailRow) -> Result<Self, Self::Error> {
        Ok(Self {
            enrollment: row.enrollment.try_into()?,
            course_code: row.course_code,
            course_name: row.course_name,
            provider: row.provider,
            fee: row.fee,
            start_date: row.start_date,
            end_date: row.end_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enrollment_row_conversion() {
        let now = Utc::now();
        let row = EnrollmentRow {
            id: 3,
            holder_id: 1,
            course_id: 2,
            status: "withdrawn".to_string(),
            enrolled_at: now,
            updated_at: now,
        };

        let enrollment = Enrollment::try_from(row).unwrap();
        assert_eq!(enrollment.status, EnrollmentStatus::Withdrawn);
    }
}
