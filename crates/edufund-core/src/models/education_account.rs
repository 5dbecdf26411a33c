//! Education account model
//!
//! Each account holder owns exactly one education account. The balance is
//! credited by top-ups and debited by course payments.

use super::account_holder::AccountHolder;
use super::text_enum;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

text_enum! {
    /// Account lifecycle state
    pub enum AccountStatus {
        /// Account can receive top-ups and pay for courses
        Active => "active",
        /// Account is frozen; balance is retained for reporting
        Closed => "closed",
    }
}

impl AccountStatus {
    /// Check if a move to `next` is allowed
    pub fn can_transition_to(&self, next: AccountStatus) -> bool {
        matches!(
            (self, next),
            (AccountStatus::Active, AccountStatus::Closed)
                | (AccountStatus::Closed, AccountStatus::Active)
        )
    }
}

text_enum! {
    /// Why an account was closed
    pub enum ClosureReason {
        /// Holder reached the configured closure age
        AgeThreshold => "age_threshold",
        /// Closed by staff
        Manual => "manual",
    }
}

/// Education account entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EducationAccount {
    /// Unique identifier
    pub id: i32,

    /// Human-facing account number
    pub account_number: String,

    /// Owning account holder
    pub holder_id: i32,

    /// Current balance
    pub balance: Decimal,

    pub status: AccountStatus,

    /// Set while the account is closed
    pub closure_reason: Option<ClosureReason>,

    pub opened_at: DateTime<Utc>,

    pub closed_at: Option<DateTime<Utc>>,

    pub updated_at: DateTime<Utc>,
}

impl EducationAccount {
    /// A new, empty, active account for `holder_id`
    pub fn open(holder_id: i32) -> Self {
        Self {
            holder_id,
            ..Default::default()
        }
    }

    /// Format the account number for a freshly assigned id
    pub fn format_number(prefix: &str, id: i32) -> String {
        format!("{}{:08}", prefix, id)
    }

    /// Check if the account accepts credits and debits
    #[inline]
    pub fn can_transact(&self) -> bool {
        self.status == AccountStatus::Active
    }

    /// Check if the balance covers `amount`
    #[inline]
    pub fn covers(&self, amount: Decimal) -> bool {
        self.balance >= amount
    }

    /// Check if the account is due for age-based closure on `today`
    pub fn is_due_for_closure(&self, holder: &AccountHolder, today: NaiveDate, closure_age: u32) -> bool {
        self.status == AccountStatus::Active && holder.age_on(today) >= closure_age
    }
}

impl Default for EducationAccount {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            account_number: String::new(),
            holder_id: 0,
            balance: Decimal::ZERO,
            status: AccountStatus::Active,
            closure_reason: None,
            opened_at: now,
            closed_at: None,
            updated_at: now,
        }
    }
}

/// An account paired with its owner, as scanned by the batch jobs
#[derive(Debug, Clone)]
pub struct AccountWithHolder {
    pub account: EducationAccount,
    pub holder: AccountHolder,
}
