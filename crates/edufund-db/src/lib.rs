//! EduFund Database Layer
//!
//! This crate provides PostgreSQL database access and repository implementations
//! for the EduFund system. It includes:
//!
//! - Connection pool management and embedded migrations with sqlx
//! - Repository implementations for all domain entities
//! - Filtered listings composed with bound parameters
//! - Transaction support for multi-row writes

pub mod pool;
pub mod repositories;

#[cfg(test)]
mod test_db;

pub use pool::{create_pool, ping, run_migrations};
pub use repositories::*;

// Re-export commonly used types
pub use edufund_core::{AppError, AppResult};
pub use sqlx::{PgPool, Postgres};
