//! Account holder DTOs
//!
//! Listing parameters arrive as strings and are parsed here so that an
//! unknown status, sort field or malformed number is reported as a 400 with
//! the standard error body.

use super::common::{parse_param, PaginationParams};
use chrono::NaiveDate;
use edufund_core::models::{
    AccountHolder, EducationAccount, EducationLevel, ResidentialStatus, SchoolingStatus,
};
use edufund_core::query::{AccountHolderFilter, AccountHolderQuery, HolderSortField, SortDirection};
use edufund_core::AppResult;
use edufund_services::HolderChanges;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Query parameters of the admin holder listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountHolderListParams {
    /// Name, NRIC, email or account number fragment
    pub search: Option<String>,
    /// `citizen`, `permanent_resident` or `foreigner`
    pub residential_status: Option<String>,
    /// `in_school` or `not_in_school`
    pub schooling_status: Option<String>,
    /// Highest education level
    pub education_level: Option<String>,
    /// `active` or `closed`
    pub account_status: Option<String>,
    /// Minimum age in years, inclusive
    pub min_age: Option<String>,
    /// Maximum age in years, inclusive
    pub max_age: Option<String>,
    /// Minimum balance, inclusive
    pub min_balance: Option<String>,
    /// Maximum balance, inclusive
    pub max_balance: Option<String>,
    /// Registered on or after this date
    pub created_from: Option<String>,
    /// Registered on or before this date
    pub created_to: Option<String>,
    /// Column to sort by
    pub sort_by: Option<String>,
    /// `asc` or `desc`
    pub sort_order: Option<String>,
}

impl AccountHolderListParams {
    /// Build the typed listing query; range checks happen in the service
    pub fn to_query(&self, pagination: &PaginationParams, today: NaiveDate) -> AppResult<AccountHolderQuery> {
        let filter = AccountHolderFilter {
            search: self.search.clone(),
            residential_status: parse_param("residential_status", self.residential_status.as_deref())?,
            schooling_status: parse_param("schooling_status", self.schooling_status.as_deref())?,
            education_level: parse_param("education_level", self.education_level.as_deref())?,
            account_status: parse_param("account_status", self.account_status.as_deref())?,
            min_age: parse_param("min_age", self.min_age.as_deref())?,
            max_age: parse_param("max_age", self.max_age.as_deref())?,
            min_balance: parse_param("min_balance", self.min_balance.as_deref())?,
            max_balance: parse_param("max_balance", self.max_balance.as_deref())?,
            created_from: parse_param("created_from", self.created_from.as_deref())?,
            created_to: parse_param("created_to", self.created_to.as_deref())?,
        };

        Ok(AccountHolderQuery {
            filter,
            sort_by: parse_param::<HolderSortField>("sort_by", self.sort_by.as_deref())?
                .unwrap_or_default(),
            direction: parse_param::<SortDirection>("sort_order", self.sort_order.as_deref())?
                .unwrap_or_default(),
            today,
            pagination: pagination.pagination(),
        })
    }
}

/// Request to register an account holder
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AccountHolderCreateRequest {
    /// National registration number
    #[validate(length(min = 1, max = 20, message = "NRIC is required"))]
    pub nric: String,

    /// Full name
    #[validate(length(min = 1, max = 200, message = "Full name is required"))]
    pub full_name: String,

    /// Date of birth
    pub date_of_birth: NaiveDate,

    /// Contact email
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    /// Contact phone number
    #[validate(length(max = 30))]
    pub phone: Option<String>,

    /// Residential address
    #[validate(length(max = 500))]
    pub residential_address: Option<String>,

    /// Residency
    pub residential_status: ResidentialStatus,

    /// Schooling status
    pub schooling_status: SchoolingStatus,

    /// Highest education level
    pub education_level: EducationLevel,
}

impl AccountHolderCreateRequest {
    /// Holder entity without an id
    pub fn to_holder(&self) -> AccountHolder {
        AccountHolder {
            nric: self.nric.clone(),
            full_name: self.full_name.clone(),
            date_of_birth: self.date_of_birth,
            email: self.email.clone(),
            phone: self.phone.clone(),
            residential_address: self.residential_address.clone(),
            residential_status: self.residential_status,
            schooling_status: self.schooling_status,
            education_level: self.education_level,
            ..Default::default()
        }
    }
}

/// Profile update; the E-Service portal only exposes the contact fields
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct AccountHolderUpdateRequest {
    /// New full name
    #[validate(length(min = 1, max = 200))]
    pub full_name: Option<String>,

    /// Corrected date of birth
    pub date_of_birth: Option<NaiveDate>,

    /// New contact email
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    /// New contact phone number
    #[validate(length(max = 30))]
    pub phone: Option<String>,

    /// New residential address
    #[validate(length(max = 500))]
    pub residential_address: Option<String>,

    /// New residency
    pub residential_status: Option<ResidentialStatus>,

    /// New schooling status
    pub schooling_status: Option<SchoolingStatus>,

    /// New education level
    pub education_level: Option<EducationLevel>,
}

impl AccountHolderUpdateRequest {
    /// All fields, for staff
    pub fn into_changes(self) -> HolderChanges {
        HolderChanges {
            full_name: self.full_name,
            date_of_birth: self.date_of_birth,
            email: self.email,
            phone: self.phone,
            residential_address: self.residential_address,
            residential_status: self.residential_status,
            schooling_status: self.schooling_status,
            education_level: self.education_level,
        }
    }
}

/// Contact details a holder may edit themselves
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProfileUpdateRequest {
    /// New contact email
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    /// New contact phone number
    #[validate(length(max = 30))]
    pub phone: Option<String>,

    /// New residential address
    #[validate(length(max = 500))]
    pub residential_address: Option<String>,
}

impl ProfileUpdateRequest {
    /// Contact fields only, for the holder
    pub fn into_changes(self) -> HolderChanges {
        HolderChanges {
            email: self.email,
            phone: self.phone,
            residential_address: self.residential_address,
            ..Default::default()
        }
    }
}

/// Set or clear a holder's E-Service password
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SetPasswordRequest {
    /// `null` revokes portal access
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
}

/// Holder together with the account opened for them
#[derive(Debug, Clone, Serialize)]
pub struct AccountHolderCreated {
    /// Registered holder
    pub holder: AccountHolder,
    /// Education account opened with the holder
    pub account: EducationAccount,
}
