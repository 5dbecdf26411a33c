//! Domain models for EduFund
//!
//! Entities shared by both portals. Status-like columns are stored as
//! lowercase text and surfaced here as enums.

pub mod account_holder;
pub mod audit;
pub mod batch_execution;
pub mod course;
pub mod education_account;
pub mod enrollment;
pub mod invoice;
pub mod top_up_rule;
pub mod transaction;
pub mod user;

pub use account_holder::{
    age_on, born_after, born_on_or_before, check_age_bound, AccountHolder, AccountHolderDetail,
    AccountHolderListItem, EducationLevel, ResidentialStatus, SchoolingStatus,
};
pub use audit::{AuditEntity, AuditLog, AuditLogBuilder, AuditLogData};
pub use batch_execution::{BatchExecution, BatchJobType, BatchOutcome, BatchStatus};
pub use course::{Course, CourseStatus};
pub use education_account::{AccountStatus, AccountWithHolder, ClosureReason, EducationAccount};
pub use enrollment::{Enrollment, EnrollmentDetail, EnrollmentStatus};
pub use invoice::{Invoice, InvoiceStatus, PaymentSplit};
pub use top_up_rule::{TopUpRule, TopUpRuleStatus};
pub use account_holder::MAX_AGE;
pub use transaction::{
    check_money_scale, PaymentMethod, Transaction, TransactionKind, TransactionStatus, MONEY_SCALE,
};
pub use user::{User, UserInfo, UserRole};

/// Declares a text-backed enum with `as_str`, `Display` and `FromStr`.
///
/// Parsing is case-insensitive; the canonical form is the lowercase name
/// stored in the database and exchanged over JSON.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $text)] $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Canonical text form
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::error::AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    other => Err($crate::error::AppError::InvalidInput(format!(
                        "unknown {} '{}'",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }
    };
}

pub(crate) use text_enum;
