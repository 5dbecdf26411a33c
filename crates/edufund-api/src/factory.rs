//! Per-request service construction
//!
//! Handlers receive a [`ServiceFactory`] as app data and build the service
//! they need from the shared pool. Repositories are cheap handles around
//! the pool, so nothing is cached between requests.

use chrono::NaiveDate;
use chrono_tz::Tz;
use edufund_core::{AppConfig, AppResult};
use edufund_db::{
    PgAccountHolderRepository, PgAuditLogRepository, PgBatchExecutionRepository,
    PgCourseRepository, PgEducationAccountRepository, PgEnrollmentRepository,
    PgInvoiceRepository, PgTopUpRuleRepository, PgTransactionRepository, PgUserRepository,
};
use edufund_services::{
    parse_timezone, today_in, AccountHolderService, BatchExecutionService, CourseService,
    DashboardService, EducationAccountService, EnrollmentService, InvoiceService,
    TopUpService, TransactionService,
};
use sqlx::PgPool;
use std::sync::Arc;

/// Builds services over the shared pool and configuration
pub struct ServiceFactory {
    pool: PgPool,
    config: AppConfig,
    timezone: Tz,
}

impl ServiceFactory {
    /// Fails when the configured batch timezone is unknown
    pub fn new(pool: PgPool, config: AppConfig) -> AppResult<Self> {
        let timezone = parse_timezone(&config.batch.timezone)?;
        Ok(Self {
            pool,
            config,
            timezone,
        })
    }

    /// Shared connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Loaded application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Timezone that decides "today" for billing and batches
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Calendar date in the configured timezone
    pub fn today(&self) -> NaiveDate {
        today_in(self.timezone)
    }

    /// Staff user repository
    pub fn users(&self) -> PgUserRepository {
        PgUserRepository::new(self.pool.clone())
    }

    /// Audit trail repository
    pub fn audit_logs(&self) -> PgAuditLogRepository {
        PgAuditLogRepository::new(self.pool.clone())
    }

    /// Holder registration, profile and listing
    pub fn account_holders(&self) -> AccountHolderService {
        AccountHolderService::new(
            Arc::new(PgAccountHolderRepository::new(self.pool.clone())),
            self.account_repo(),
            Arc::new(PgEnrollmentRepository::new(self.pool.clone())),
            Arc::new(PgInvoiceRepository::new(self.pool.clone())),
            self.config.billing.account_number_prefix.clone(),
        )
    }

    /// Account closure, reopening and ad-hoc top-ups
    pub fn education_accounts(&self) -> EducationAccountService {
        EducationAccountService::new(
            self.account_repo(),
            Arc::new(PgTransactionRepository::new(self.pool.clone())),
            Arc::new(PgBatchExecutionRepository::new(self.pool.clone())),
            self.config.batch.account_closure_age,
        )
    }

    /// Course catalogue
    pub fn courses(&self) -> CourseService {
        CourseService::new(
            Arc::new(PgCourseRepository::new(self.pool.clone())),
            Arc::new(PgEnrollmentRepository::new(self.pool.clone())),
        )
    }

    /// Enrollment with fee invoicing
    pub fn enrollments(&self) -> EnrollmentService {
        EnrollmentService::new(
            Arc::new(PgEnrollmentRepository::new(self.pool.clone())),
            Arc::new(PgCourseRepository::new(self.pool.clone())),
            Arc::new(PgAccountHolderRepository::new(self.pool.clone())),
            self.account_repo(),
            self.config.billing.payment_terms_days,
            self.config.billing.invoice_number_prefix.clone(),
        )
    }

    /// Invoice lookups and payment
    pub fn invoices(&self) -> InvoiceService {
        InvoiceService::new(
            Arc::new(PgInvoiceRepository::new(self.pool.clone())),
            self.account_repo(),
        )
    }

    /// Transaction ledger
    pub fn transactions(&self) -> TransactionService {
        TransactionService::new(
            Arc::new(PgTransactionRepository::new(self.pool.clone())),
            self.account_repo(),
        )
    }

    /// Top-up rules and their execution
    pub fn top_ups(&self) -> TopUpService {
        TopUpService::new(
            Arc::new(PgTopUpRuleRepository::new(self.pool.clone())),
            self.account_repo(),
            Arc::new(PgTransactionRepository::new(self.pool.clone())),
            Arc::new(PgBatchExecutionRepository::new(self.pool.clone())),
        )
    }

    /// Batch run history
    pub fn batch_executions(&self) -> BatchExecutionService {
        BatchExecutionService::new(Arc::new(PgBatchExecutionRepository::new(self.pool.clone())))
    }

    /// Admin Portal dashboard figures
    pub fn dashboard(&self) -> DashboardService {
        DashboardService::new(
            Arc::new(PgAccountHolderRepository::new(self.pool.clone())),
            self.account_repo(),
            Arc::new(PgInvoiceRepository::new(self.pool.clone())),
            Arc::new(PgBatchExecutionRepository::new(self.pool.clone())),
        )
    }

    fn account_repo(&self) -> Arc<PgEducationAccountRepository> {
        Arc::new(PgEducationAccountRepository::new(self.pool.clone()))
    }
}
