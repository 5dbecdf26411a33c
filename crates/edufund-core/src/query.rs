//! Listing queries
//!
//! Filter, sort and page descriptions handed from the services to the
//! repositories. They carry typed values only; SQL is built in `edufund-db`.

use crate::error::AppError;
use crate::models::{
    check_age_bound, text_enum, AccountStatus, BatchJobType, CourseStatus, EducationLevel, InvoiceStatus,
    ResidentialStatus, SchoolingStatus, TransactionKind, TransactionStatus,
};
use crate::traits::Pagination;
use crate::AppResult;
use chrono::NaiveDate;
use rust_decimal::Decimal;

text_enum! {
    /// Sortable columns of the account-holder listing
    #[derive(Default)]
    pub enum HolderSortField {
        #[default]
        FullName => "full_name",
        Nric => "nric",
        Age => "age",
        Balance => "balance",
        CreatedAt => "created_at",
    }
}

text_enum! {
    /// Sort order
    #[derive(Default)]
    pub enum SortDirection {
        #[default]
        Asc => "asc",
        Desc => "desc",
    }
}

impl SortDirection {
    /// The opposite order
    pub fn reversed(&self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// Conditions for the admin account-holder listing; every field is optional
#[derive(Debug, Clone, Default)]
pub struct AccountHolderFilter {
    /// Case-insensitive match on name, NRIC, email or account number
    pub search: Option<String>,
    pub residential_status: Option<ResidentialStatus>,
    pub schooling_status: Option<SchoolingStatus>,
    pub education_level: Option<EducationLevel>,
    pub account_status: Option<AccountStatus>,
    pub min_age: Option<u32>,
    pub max_age: Option<u32>,
    pub min_balance: Option<Decimal>,
    pub max_balance: Option<Decimal>,
    pub created_from: Option<NaiveDate>,
    pub created_to: Option<NaiveDate>,
}

impl AccountHolderFilter {
    /// Reject contradictory or out-of-range bounds
    pub fn validate(&self) -> AppResult<()> {
        check_age_bound("min_age", self.min_age)?;
        check_age_bound("max_age", self.max_age)?;
        if let (Some(min), Some(max)) = (self.min_age, self.max_age) {
            if min > max {
                return Err(AppError::Validation(format!(
                    "min_age {} is greater than max_age {}",
                    min, max
                )));
            }
        }
        if let (Some(min), Some(max)) = (self.min_balance, self.max_balance) {
            if min > max {
                return Err(AppError::Validation(format!(
                    "min_balance {} is greater than max_balance {}",
                    min, max
                )));
            }
        }
        if let (Some(from), Some(to)) = (self.created_from, self.created_to) {
            if from > to {
                return Err(AppError::Validation(format!(
                    "created_from {} is after created_to {}",
                    from, to
                )));
            }
        }
        Ok(())
    }

    /// Trimmed search text, `None` when blank
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Full account-holder listing request
#[derive(Debug, Clone)]
pub struct AccountHolderQuery {
    pub filter: AccountHolderFilter,
    pub sort_by: HolderSortField,
    pub direction: SortDirection,
    /// Reference date for age filters and age sorting
    pub today: NaiveDate,
    pub pagination: Pagination,
}

/// Transaction listing request
#[derive(Debug, Clone, Default)]
pub struct TransactionQuery {
    pub account_id: Option<i32>,
    pub kind: Option<TransactionKind>,
    pub status: Option<TransactionStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub pagination: Pagination,
}

/// Invoice listing request
#[derive(Debug, Clone, Default)]
pub struct InvoiceQuery {
    pub holder_id: Option<i32>,
    pub enrollment_id: Option<i32>,
    pub status: Option<InvoiceStatus>,
    /// Only invoices due strictly before this date
    pub due_before: Option<NaiveDate>,
    pub pagination: Pagination,
}

/// Course listing request
#[derive(Debug, Clone, Default)]
pub struct CourseQuery {
    pub status: Option<CourseStatus>,
    pub provider: Option<String>,
    pub search: Option<String>,
    pub pagination: Pagination,
}

/// Batch history request
#[derive(Debug, Clone, Default)]
pub struct BatchExecutionQuery {
    pub job_type: Option<BatchJobType>,
    pub pagination: Pagination,
}
