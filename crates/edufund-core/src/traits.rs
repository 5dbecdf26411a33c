//! Common traits for repositories
//!
//! Defines the storage seams used by the application services. Every method
//! that writes more than one row runs as a single database transaction.

use crate::error::AppError;
use crate::models::{
    AccountHolder, AccountHolderListItem, AccountStatus, AccountWithHolder, BatchExecution,
    BatchJobType, BatchOutcome, ClosureReason, Course, EducationAccount, Enrollment,
    EnrollmentDetail, EnrollmentStatus, Invoice, InvoiceStatus, PaymentSplit, TopUpRule,
    TopUpRuleStatus, Transaction, User,
};
use crate::query::{
    AccountHolderQuery, BatchExecutionQuery, CourseQuery, InvoiceQuery, TransactionQuery,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Generic repository trait for CRUD operations
#[async_trait]
pub trait Repository<T, ID>: Send + Sync {
    /// Find entity by ID
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, AppError>;

    /// Find all entities with pagination
    async fn find_all(&self, limit: i64, offset: i64) -> Result<Vec<T>, AppError>;

    /// Count total entities
    async fn count(&self) -> Result<i64, AppError>;

    /// Create a new entity
    async fn create(&self, entity: &T) -> Result<T, AppError>;

    /// Update an existing entity
    async fn update(&self, entity: &T) -> Result<T, AppError>;

    /// Delete entity by ID
    async fn delete(&self, id: ID) -> Result<bool, AppError>;
}

/// Staff user repository
#[async_trait]
pub trait UserRepository: Repository<User, i32> {
    /// Find user by username
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    /// Update last login timestamp
    async fn update_last_login(&self, id: i32) -> Result<(), AppError>;

    /// Replace the password hash
    async fn update_password(&self, id: i32, password_hash: &str) -> Result<bool, AppError>;
}

/// Account holder repository
#[async_trait]
pub trait AccountHolderRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> Result<Option<AccountHolder>, AppError>;

    /// Find holder by normalized NRIC
    async fn find_by_nric(&self, nric: &str) -> Result<Option<AccountHolder>, AppError>;

    /// Filtered, sorted and paged listing; returns the page and the total match count
    async fn search(
        &self,
        query: &AccountHolderQuery,
    ) -> Result<(Vec<AccountHolderListItem>, i64), AppError>;

    /// Insert the holder and open their education account in one transaction.
    ///
    /// The account number is `account_prefix` followed by the zero-padded account id.
    async fn create_with_account(
        &self,
        holder: &AccountHolder,
        account_prefix: &str,
    ) -> Result<(AccountHolder, EducationAccount), AppError>;

    /// Update profile fields (not the password)
    async fn update(&self, holder: &AccountHolder) -> Result<AccountHolder, AppError>;

    /// Set or clear the E-Service password hash
    async fn update_password(&self, id: i32, password_hash: Option<&str>) -> Result<bool, AppError>;

    async fn count(&self) -> Result<i64, AppError>;
}

/// Account totals for the dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccountSummary {
    pub active: i64,
    pub closed: i64,
    /// Sum of balances across active accounts
    pub total_balance: Decimal,
}

/// Education account repository
#[async_trait]
pub trait EducationAccountRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> Result<Option<EducationAccount>, AppError>;

    async fn find_by_holder(&self, holder_id: i32) -> Result<Option<EducationAccount>, AppError>;

    async fn find_by_number(&self, account_number: &str) -> Result<Option<EducationAccount>, AppError>;

    async fn list(
        &self,
        status: Option<AccountStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<EducationAccount>, i64), AppError>;

    /// Every active account joined with its holder, for batch scans
    async fn list_active_with_holders(&self) -> Result<Vec<AccountWithHolder>, AppError>;

    /// Close an active account; `None` when it is not active
    async fn close(
        &self,
        id: i32,
        reason: ClosureReason,
        at: DateTime<Utc>,
    ) -> Result<Option<EducationAccount>, AppError>;

    /// Close every listed account that is still active; returns the number closed
    async fn close_many(
        &self,
        ids: &[i32],
        reason: ClosureReason,
        at: DateTime<Utc>,
    ) -> Result<u64, AppError>;

    /// Reopen a closed account; `None` when it is not closed
    async fn reopen(&self, id: i32) -> Result<Option<EducationAccount>, AppError>;

    async fn summary(&self) -> Result<AccountSummary, AppError>;
}

/// One balance credit inside a top-up run
#[derive(Debug, Clone, PartialEq)]
pub struct TopUpEntry {
    pub account_id: i32,
    pub amount: Decimal,
    pub topup_rule_id: Option<i32>,
    pub description: Option<String>,
    pub performed_by: String,
}

/// Transaction ledger repository
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Transaction>, AppError>;

    async fn list(&self, query: &TransactionQuery) -> Result<(Vec<Transaction>, i64), AppError>;

    /// Credit each account and write one `top_up` row per credit.
    ///
    /// Accounts that are not active when written are skipped; the returned
    /// rows cover only the credits that were applied.
    async fn record_top_ups(&self, entries: &[TopUpEntry]) -> Result<Vec<Transaction>, AppError>;
}

/// An invoice settlement request
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentEntry {
    pub invoice_id: i32,
    pub account_id: i32,
    pub split: PaymentSplit,
    pub performed_by: String,
}

/// Invoice totals
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutstandingSummary {
    pub count: i64,
    pub amount: Decimal,
}

/// Invoice repository
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> Result<Option<Invoice>, AppError>;

    async fn list(&self, query: &InvoiceQuery) -> Result<(Vec<Invoice>, i64), AppError>;

    /// Move an invoice from `from` to `to`; `None` when it was not in `from`
    async fn transition(
        &self,
        id: i32,
        from: InvoiceStatus,
        to: InvoiceStatus,
    ) -> Result<Option<Invoice>, AppError>;

    /// Settle an invoice in one transaction.
    ///
    /// Fails with `InvalidStatusTransition` unless the invoice is outstanding,
    /// `AccountClosed` unless the account is active and `InsufficientBalance`
    /// when the balance does not cover the balance-funded part.
    async fn pay(&self, payment: &PaymentEntry) -> Result<(Invoice, Vec<Transaction>), AppError>;

    /// Outstanding invoices, optionally for one holder
    async fn outstanding_summary(&self, holder_id: Option<i32>) -> Result<OutstandingSummary, AppError>;
}

/// Enrollment repository
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> Result<Option<Enrollment>, AppError>;

    /// Enrollments of a holder joined with their course
    async fn list_by_holder(&self, holder_id: i32) -> Result<Vec<EnrollmentDetail>, AppError>;

    async fn find_active(&self, holder_id: i32, course_id: i32) -> Result<Option<Enrollment>, AppError>;

    /// Insert the enrollment and its invoice in one transaction.
    ///
    /// The invoice number is derived from `invoice_prefix`, the issue month and the invoice id.
    async fn enroll(
        &self,
        enrollment: &Enrollment,
        invoice: &Invoice,
        invoice_prefix: &str,
    ) -> Result<(Enrollment, Invoice), AppError>;

    /// Move an enrollment from `from` to `to`; `None` when it was not in `from`.
    ///
    /// Moving to `withdrawn` also cancels the enrollment's outstanding invoices.
    async fn set_status(
        &self,
        id: i32,
        from: EnrollmentStatus,
        to: EnrollmentStatus,
    ) -> Result<Option<Enrollment>, AppError>;

    async fn count_active_by_course(&self, course_id: i32) -> Result<i64, AppError>;
}

/// Course catalogue repository
#[async_trait]
pub trait CourseRepository: Repository<Course, i32> {
    async fn find_by_code(&self, course_code: &str) -> Result<Option<Course>, AppError>;

    async fn list_filtered(&self, query: &CourseQuery) -> Result<(Vec<Course>, i64), AppError>;
}

/// Top-up rule repository
#[async_trait]
pub trait TopUpRuleRepository: Repository<TopUpRule, i32> {
    /// Scheduled rules with `scheduled_date <= today`, oldest first
    async fn find_due(&self, today: NaiveDate) -> Result<Vec<TopUpRule>, AppError>;

    async fn list_filtered(
        &self,
        status: Option<TopUpRuleStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<TopUpRule>, i64), AppError>;

    /// Move a rule from `from` to `to`; `None` when it was not in `from`
    async fn set_status(
        &self,
        id: i32,
        from: TopUpRuleStatus,
        to: TopUpRuleStatus,
        executed_at: Option<DateTime<Utc>>,
    ) -> Result<Option<TopUpRule>, AppError>;

    /// Return an executed rule to `scheduled` and clear `executed_at`
    async fn release(&self, id: i32) -> Result<Option<TopUpRule>, AppError>;
}

/// Batch run history repository
#[async_trait]
pub trait BatchExecutionRepository: Send + Sync {
    /// Record a run in `running` state
    async fn start(
        &self,
        job_type: BatchJobType,
        reference: Option<String>,
        triggered_by: &str,
    ) -> Result<BatchExecution, AppError>;

    async fn finish(&self, id: i64, outcome: &BatchOutcome) -> Result<BatchExecution, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<BatchExecution>, AppError>;

    async fn list(&self, query: &BatchExecutionQuery) -> Result<(Vec<BatchExecution>, i64), AppError>;
}

/// Default page size for listings
pub const DEFAULT_PER_PAGE: i64 = 50;

/// Largest page size accepted by listings
pub const MAX_PER_PAGE: i64 = 1000;

/// Pagination parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl Pagination {
    pub fn new(page: i64, per_page: i64) -> Self {
        Self::with_cap(page, per_page, MAX_PER_PAGE)
    }

    /// Same as `new` with a custom page size cap
    pub fn with_cap(page: i64, per_page: i64, cap: i64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, cap.max(1)),
        }
    }

    /// Rows to skip; saturates for absurd page numbers
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }
}

/// Paginated response wrapper
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total: i64, pagination: Pagination) -> Self {
        Self {
            data,
            pagination: PaginationMeta::new(total, pagination.page, pagination.per_page),
        }
    }

    /// Convert every item, keeping the page metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedResponse<U> {
        PaginatedResponse {
            data: self.data.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

/// Pagination metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaginationMeta {
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl PaginationMeta {
    pub fn new(total: i64, page: i64, per_page: i64) -> Self {
        let total_pages = if per_page > 0 {
            (total + per_page - 1) / per_page
        } else {
            0
        };

        Self {
            total,
            page,
            per_page,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination() {
        let p = Pagination::new(1, 10);
        assert_eq!(p.offset(), 0);
        assert_eq!(p.limit(), 10);

        let p = Pagination::new(3, 20);
        assert_eq!(p.offset(), 40);
        assert_eq!(p.limit(), 20);
    }

    #[test]
    fn test_pagination_bounds() {
        let p = Pagination::new(0, 10); // page 0 becomes 1
        assert_eq!(p.page, 1);

        let p = Pagination::new(1, 2000); // per_page capped at 1000
        assert_eq!(p.per_page, 1000);

        let p = Pagination::new(1, 0);
        assert_eq!(p.per_page, 1);

        let p = Pagination::with_cap(2, 500, 100);
        assert_eq!(p.per_page, 100);
        assert_eq!(p.offset(), 100);
    }

    #[test]
    fn test_huge_page_does_not_overflow() {
        let p = Pagination::new(i64::MAX, 1000);
        assert_eq!(p.offset(), i64::MAX);

        let p = Pagination::new(i64::MAX / 2, 50);
        assert!(p.offset() > 0);
    }

    #[test]
    fn test_pagination_default() {
        let p = Pagination::default();
        assert_eq!(p.page, 1);
        assert_eq!(p.per_page, DEFAULT_PER_PAGE);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn test_paginated_response_map() {
        let page = PaginatedResponse::new(vec![1, 2, 3], 23, Pagination::new(2, 3));
        let page = page.map(|n| n * 10);
        assert_eq!(page.data, vec![10, 20, 30]);
        assert_eq!(page.pagination.total_pages, 8);
        assert_eq!(page.pagination.page, 2);
    }

    #[test]
    fn test_pagination_meta() {
        let meta = PaginationMeta::new(95, 1, 10);
        assert_eq!(meta.total_pages, 10);

        let meta = PaginationMeta::new(100, 1, 10);
        assert_eq!(meta.total_pages, 10);

        let meta = PaginationMeta::new(101, 1, 10);
        assert_eq!(meta.total_pages, 11);

        let meta = PaginationMeta::new(0, 1, 10);
        assert_eq!(meta.total_pages, 0);
    }
}
