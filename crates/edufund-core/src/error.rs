//! Unified error handling for EduFund
//!
//! Every failure in the workspace is converted to [`AppError`], which maps
//! itself to an HTTP status and a stable machine-readable code.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Main application error type
///
/// Implements `ResponseError` so handlers can return it directly.
#[derive(Error, Debug)]
pub enum AppError {
    // ==================== Database Errors ====================
    #[error("Database error: {0}")]
    Database(String),

    #[error("Database pool error: {0}")]
    Pool(String),

    #[error("Transaction failed: {0}")]
    Transaction(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    // ==================== Authentication Errors ====================
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: insufficient permissions")]
    Forbidden,

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    // ==================== Business Logic Errors ====================
    #[error("Account holder not found: {0}")]
    AccountHolderNotFound(String),

    #[error("Education account not found: {0}")]
    EducationAccountNotFound(String),

    #[error("Education account is closed: {0}")]
    AccountClosed(String),

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: String, available: String },

    #[error("Course not found: {0}")]
    CourseNotFound(String),

    #[error("Course is not open for enrollment: {0}")]
    CourseInactive(String),

    #[error("Already enrolled: {0}")]
    AlreadyEnrolled(String),

    #[error("Enrollment not found: {0}")]
    EnrollmentNotFound(String),

    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("Top-up rule not found: {0}")]
    TopUpRuleNotFound(String),

    #[error("Batch execution not found: {0}")]
    BatchExecutionNotFound(String),

    #[error("Invalid {entity} status transition: {from} -> {to}")]
    InvalidStatusTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("User not found: {0}")]
    UserNotFound(String),

    // ==================== Validation Errors ====================
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    // ==================== Resource Errors ====================
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    // ==================== Internal Errors ====================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// Shorthand for a rejected status change
    pub fn transition(entity: &'static str, from: impl ToString, to: impl ToString) -> Self {
        AppError::InvalidStatusTransition {
            entity,
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation(_) | AppError::InvalidInput(_) | AppError::MissingField(_) => {
                StatusCode::BAD_REQUEST
            }

            // 401 Unauthorized
            AppError::InvalidCredentials | AppError::InvalidToken(_) | AppError::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }

            // 402 Payment Required
            AppError::InsufficientBalance { .. } => StatusCode::PAYMENT_REQUIRED,

            // 403 Forbidden
            AppError::Forbidden | AppError::Unauthorized(_) | AppError::AccountClosed(_) => {
                StatusCode::FORBIDDEN
            }

            // 404 Not Found
            AppError::AccountHolderNotFound(_)
            | AppError::EducationAccountNotFound(_)
            | AppError::CourseNotFound(_)
            | AppError::EnrollmentNotFound(_)
            | AppError::InvoiceNotFound(_)
            | AppError::TransactionNotFound(_)
            | AppError::TopUpRuleNotFound(_)
            | AppError::BatchExecutionNotFound(_)
            | AppError::UserNotFound(_)
            | AppError::NotFound(_) => StatusCode::NOT_FOUND,

            // 409 Conflict
            AppError::Conflict(_)
            | AppError::AlreadyExists(_)
            | AppError::AlreadyEnrolled(_)
            | AppError::InvalidStatusTransition { .. } => StatusCode::CONFLICT,

            // 422 Unprocessable Entity
            AppError::CourseInactive(_) => StatusCode::UNPROCESSABLE_ENTITY,

            // 500 Internal Server Error
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database_error",
            AppError::Pool(_) => "pool_error",
            AppError::Transaction(_) => "transaction_error",
            AppError::Migration(_) => "migration_error",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::TokenExpired => "token_expired",
            AppError::InvalidToken(_) => "invalid_token",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden => "forbidden",
            AppError::PasswordHash(_) => "password_error",
            AppError::AccountHolderNotFound(_) => "account_holder_not_found",
            AppError::EducationAccountNotFound(_) => "education_account_not_found",
            AppError::AccountClosed(_) => "account_closed",
            AppError::InsufficientBalance { .. } => "insufficient_balance",
            AppError::CourseNotFound(_) => "course_not_found",
            AppError::CourseInactive(_) => "course_inactive",
            AppError::AlreadyEnrolled(_) => "already_enrolled",
            AppError::EnrollmentNotFound(_) => "enrollment_not_found",
            AppError::InvoiceNotFound(_) => "invoice_not_found",
            AppError::TransactionNotFound(_) => "transaction_not_found",
            AppError::TopUpRuleNotFound(_) => "top_up_rule_not_found",
            AppError::BatchExecutionNotFound(_) => "batch_execution_not_found",
            AppError::InvalidStatusTransition { .. } => "invalid_status_transition",
            AppError::UserNotFound(_) => "user_not_found",
            AppError::Validation(_) => "validation_error",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::MissingField(_) => "missing_field",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::AlreadyExists(_) => "already_exists",
            AppError::Internal(_) => "internal_error",
            AppError::Config(_) => "config_error",
            AppError::Serialization(_) => "serialization_error",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        AppError::status_code(self)
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = json!({
            "error": self.error_code(),
            "message": self.to_string(),
            "status": status.as_u16(),
        });

        HttpResponse::build(status).json(body)
    }
}

// ==================== From implementations ====================

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            AppError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::AccountHolderNotFound("42".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::InsufficientBalance {
                required: "10.00".to_string(),
                available: "5.00".to_string()
            }
            .status_code(),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            AppError::AccountClosed("EA00000001".to_string()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::transition("invoice", "paid", "cancelled").status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AppError::InvalidCredentials.error_code(),
            "invalid_credentials"
        );
        assert_eq!(
            AppError::transition("invoice", "paid", "outstanding").error_code(),
            "invalid_status_transition"
        );
        assert_eq!(
            AppError::AlreadyEnrolled("S1234567A".to_string()).error_code(),
            "already_enrolled"
        );
    }

    #[test]
    fn test_transition_message() {
        let err = AppError::transition("invoice", "paid", "cancelled");
        assert_eq!(
            err.to_string(),
            "Invalid invoice status transition: paid -> cancelled"
        );
    }
}
