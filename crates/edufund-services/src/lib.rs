//! Business logic services for EduFund
//!
//! Services orchestrate the repositories defined in `edufund-core` and
//! enforce the rules that span more than one entity: enrolling issues an
//! invoice, paying debits the education account, batch jobs record their
//! runs.
//!
//! # Architecture
//!
//! - Each service holds its repositories as `Arc<dyn Trait>`
//! - Services take "today" as a parameter; the caller decides the timezone
//! - All mutating operations are instrumented with tracing
//!
//! # Services
//!
//! - `AccountHolderService` - holder registration, search and profile updates
//! - `EducationAccountService` - account lifecycle, manual top-ups, auto-closure
//! - `CourseService` - course catalogue
//! - `EnrollmentService` - enrollment and course-fee invoicing
//! - `InvoiceService` - invoice cancellation and payment
//! - `TransactionService` - transaction history
//! - `TopUpService` - top-up rules and their execution
//! - `BatchExecutionService` - batch run history
//! - `DashboardService` - Admin Portal summary figures
//! - `BatchScheduler` - interval loops for the batch jobs

pub mod account_holder_service;
pub mod batch_execution_service;
pub mod clock;
pub mod course_service;
pub mod dashboard_service;
pub mod education_account_service;
pub mod enrollment_service;
pub mod invoice_service;
pub mod scheduler;
pub mod top_up_service;
pub mod transaction_service;

#[cfg(test)]
mod test_support;

pub use account_holder_service::{AccountHolderService, HolderChanges};
pub use batch_execution_service::BatchExecutionService;
pub use clock::{parse_timezone, today_in};
pub use course_service::{CourseChanges, CourseService};
pub use dashboard_service::{DashboardService, DashboardSummary};
pub use education_account_service::EducationAccountService;
pub use enrollment_service::EnrollmentService;
pub use invoice_service::InvoiceService;
pub use scheduler::{BatchScheduler, SCHEDULER_ACTOR};
pub use top_up_service::{TopUpRuleChanges, TopUpService};
pub use transaction_service::TransactionService;
