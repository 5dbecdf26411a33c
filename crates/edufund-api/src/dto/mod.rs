//! Data Transfer Objects (DTOs) for API requests and responses

pub mod account_holder;
pub mod audit;
pub mod auth;
pub mod batch;
pub mod common;
pub mod course;
pub mod education_account;
pub mod enrollment;
pub mod invoice;
pub mod top_up_rule;
pub mod transaction;
pub mod user;

pub use account_holder::*;
pub use audit::*;
pub use auth::*;
pub use batch::*;
pub use common::*;
pub use course::*;
pub use education_account::*;
pub use enrollment::*;
pub use invoice::*;
pub use top_up_rule::*;
pub use transaction::*;
pub use user::*;
