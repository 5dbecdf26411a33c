//! Account holder model
//!
//! An account holder is the person an education account belongs to. Holders
//! are registered by staff in the Admin Portal and sign in to the E-Service
//! portal with their NRIC.

use super::education_account::EducationAccount;
use super::enrollment::EnrollmentDetail;
use super::text_enum;
use crate::error::AppError;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

text_enum! {
    /// Residency of the holder, used by top-up eligibility
    pub enum ResidentialStatus {
        Citizen => "citizen",
        PermanentResident => "permanent_resident",
        Foreigner => "foreigner",
    }
}

text_enum! {
    /// Whether the holder is currently enrolled in formal schooling
    pub enum SchoolingStatus {
        InSchool => "in_school",
        NotInSchool => "not_in_school",
    }
}

text_enum! {
    /// Highest education level attained or in progress
    pub enum EducationLevel {
        Primary => "primary",
        Secondary => "secondary",
        PostSecondary => "post_secondary",
        Tertiary => "tertiary",
        NoFormal => "none",
    }
}

/// Account holder entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountHolder {
    /// Unique identifier
    pub id: i32,

    /// National identifier, stored upper-case
    pub nric: String,

    pub full_name: String,

    pub date_of_birth: NaiveDate,

    pub email: Option<String>,

    pub phone: Option<String>,

    pub residential_address: Option<String>,

    pub residential_status: ResidentialStatus,

    pub schooling_status: SchoolingStatus,

    pub education_level: EducationLevel,

    /// E-Service password hash; `None` until staff issue a password
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl AccountHolder {
    /// Canonical NRIC form: trimmed, upper-case, no inner whitespace
    pub fn normalize_nric(nric: &str) -> String {
        nric.chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_uppercase()
    }

    /// Age in whole years on `date`
    pub fn age_on(&self, date: NaiveDate) -> u32 {
        age_on(self.date_of_birth, date)
    }

    /// Whether the holder can sign in to the E-Service portal
    pub fn has_portal_access(&self) -> bool {
        self.password_hash.is_some()
    }
}

/// Age in whole years of someone born on `birth` as of `on`.
///
/// A 29 February birthday is reached on 1 March in non-leap years. Dates
/// before the birth date yield 0.
pub fn age_on(birth: NaiveDate, on: NaiveDate) -> u32 {
    if on <= birth {
        return 0;
    }
    let mut years = on.year() - birth.year();
    if (on.month(), on.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    years.max(0) as u32
}

/// Largest age accepted by age filters and eligibility criteria
pub const MAX_AGE: u32 = 150;

/// Latest birth date of someone who is at least `age` years old on `on`
pub fn born_on_or_before(age: u32, on: NaiveDate) -> NaiveDate {
    age.checked_mul(12)
        .and_then(|months| on.checked_sub_months(chrono::Months::new(months)))
        .unwrap_or(NaiveDate::MIN)
}

/// Earliest birth date of someone who is at most `age` years old on `on`
pub fn born_after(age: u32, on: NaiveDate) -> NaiveDate {
    born_on_or_before(age.saturating_add(1), on)
}

/// Reject an age bound above [`MAX_AGE`]
pub fn check_age_bound(field: &str, age: Option<u32>) -> Result<(), AppError> {
    match age {
        Some(age) if age > MAX_AGE => Err(AppError::Validation(format!(
            "{} must be at most {}",
            field, MAX_AGE
        ))),
        _ => Ok(()),
    }
}

impl Default for AccountHolder {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            nric: String::new(),
            full_name: String::new(),
            date_of_birth: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default(),
            email: None,
            phone: None,
            residential_address: None,
            residential_status: ResidentialStatus::Citizen,
            schooling_status: SchoolingStatus::InSchool,
            education_level: EducationLevel::Secondary,
            password_hash: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Row of the admin holder listing: holder columns joined with the account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountHolderListItem {
    pub holder: AccountHolder,
    pub account_id: Option<i32>,
    pub account_number: Option<String>,
    pub account_status: Option<super::AccountStatus>,
    pub balance: Option<Decimal>,
}

/// Everything the admin detail page shows about one holder
#[derive(Debug, Clone, Serialize)]
pub struct AccountHolderDetail {
    pub holder: AccountHolder,
    pub account: Option<EducationAccount>,
    pub enrollments: Vec<EnrollmentDetail>,
    pub outstanding_invoices: i64,
    pub outstanding_amount: Decimal,
}
