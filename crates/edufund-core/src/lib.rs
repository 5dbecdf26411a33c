//! EduFund Core Library
//!
//! This crate provides the foundational types, traits, and error handling
//! for the EduFund system. It includes:
//!
//! - Domain models (AccountHolder, EducationAccount, Invoice, etc.)
//! - Repository traits and listing queries
//! - Unified error handling with HTTP response mapping
//! - Application configuration

pub mod config;
pub mod error;
pub mod models;
pub mod query;
pub mod traits;

pub use config::AppConfig;
pub use error::AppError;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
