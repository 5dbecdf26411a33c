//! Repository implementations
//!
//! This module contains concrete implementations of all repository traits
//! defined in edufund-core, using sqlx for PostgreSQL access.

pub mod account_holder_repo;
pub mod audit_repo;
pub mod batch_execution_repo;
pub mod course_repo;
pub mod education_account_repo;
pub mod enrollment_repo;
pub mod invoice_repo;
pub mod top_up_rule_repo;
pub mod transaction_repo;
pub mod user_repo;

pub use account_holder_repo::PgAccountHolderRepository;
pub use audit_repo::{AuditLogFilter, PgAuditLogRepository};
pub use batch_execution_repo::PgBatchExecutionRepository;
pub use course_repo::PgCourseRepository;
pub use education_account_repo::PgEducationAccountRepository;
pub use enrollment_repo::PgEnrollmentRepository;
pub use invoice_repo::PgInvoiceRepository;
pub use top_up_rule_repo::PgTopUpRuleRepository;
pub use transaction_repo::PgTransactionRepository;
pub use user_repo::PgUserRepository;

use edufund_core::{AppError, AppResult};
use std::str::FromStr;

/// Parse a text column into its domain enum
pub(crate) fn parse_column<T>(column: &str, value: &str) -> AppResult<T>
where
    T: FromStr<Err = AppError>,
{
    value
        .parse()
        .map_err(|_| AppError::Database(format!("Unexpected {} value '{}'", column, value)))
}

/// Parse an optional text column into its domain enum
pub(crate) fn parse_optional<T>(column: &str, value: Option<&str>) -> AppResult<Option<T>>
where
    T: FromStr<Err = AppError>,
{
    value.map(|v| parse_column(column, v)).transpose()
}

/// Check if a sqlx error is a unique-constraint violation
pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

/// Escape `%`, `_` and `\` for use inside an ILIKE pattern
pub(crate) fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Map a transaction begin/commit failure
pub(crate) fn tx_error(stage: &str, e: sqlx::Error) -> AppError {
    tracing::error!("Failed to {} transaction: {}", stage, e);
    AppError::Transaction(format!("Failed to {} transaction: {}", stage, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use edufund_core::models::AccountStatus;

    #[test]
    fn test_parse_column() {
        let status: AccountStatus = parse_column("status", "closed").unwrap();
        assert_eq!(status, AccountStatus::Closed);

        let err = parse_column::<AccountStatus>("status", "frozen").unwrap_err();
        assert!(matches!(err, AppError::Database(_)));

        let none: Option<AccountStatus> = parse_optional("status", None).unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_like_pattern() {
        assert_eq!(like_pattern("tan"), "%tan%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
