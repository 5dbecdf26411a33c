//! Fixtures for the Postgres-backed repository tests
//!
//! These tests are `#[ignore]`d and run against `DATABASE_URL` with
//! `cargo test -- --ignored`. Every fixture uses fresh NRICs and course codes
//! so runs never collide.

use crate::pool::{create_pool, run_migrations};
use crate::repositories::{
    PgAccountHolderRepository, PgCourseRepository, PgEnrollmentRepository,
};
use chrono::Utc;
use edufund_core::config::DatabaseConfig;
use edufund_core::models::{AccountHolder, Course, EducationAccount, Enrollment, Invoice};
use edufund_core::traits::{AccountHolderRepository, EnrollmentRepository, Repository};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

fn test_config() -> DatabaseConfig {
    DatabaseConfig {
        url: std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/edufund".to_string()),
        max_connections: 5,
        min_connections: 1,
        acquire_timeout_secs: 5,
        idle_timeout_secs: 60,
        run_migrations: true,
    }
}

fn unique(prefix: &str) -> String {
    format!("{}{}", prefix, &Uuid::new_v4().simple().to_string()[..8]).to_uppercase()
}

pub(crate) async fn pool() -> PgPool {
    let pool = create_pool(&test_config()).await.unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}

pub(crate) async fn seed_holder(pool: &PgPool) -> (AccountHolder, EducationAccount) {
    let holder = AccountHolder {
        nric: unique("T"),
        full_name: "Repository Test".to_string(),
        ..Default::default()
    };
    PgAccountHolderRepository::new(pool.clone())
        .create_with_account(&holder, "EA")
        .await
        .unwrap()
}

pub(crate) async fn set_balance(pool: &PgPool, account_id: i32, balance: Decimal) {
    sqlx::query("UPDATE education_accounts SET balance = $2 WHERE id = $1")
        .bind(account_id)
        .bind(balance)
        .execute(pool)
        .await
        .unwrap();
}

pub(crate) async fn balance(pool: &PgPool, account_id: i32) -> Decimal {
    sqlx::query_scalar("SELECT balance FROM education_accounts WHERE id = $1")
        .bind(account_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Enroll the holder in a new course and return the fee invoice
pub(crate) async fn seed_invoice(pool: &PgPool, holder_id: i32, fee: Decimal) -> Invoice {
    let today = Utc::now().date_naive();
    let course = PgCourseRepository::new(pool.clone())
        .create(&Course {
            course_code: unique("C-"),
            name: "Repository test course".to_string(),
            provider: "Polytechnic".to_string(),
            fee,
            start_date: today,
            end_date: today + chrono::Duration::days(30),
            ..Default::default()
        })
        .await
        .unwrap();

    let (_, invoice) = PgEnrollmentRepository::new(pool.clone())
        .enroll(
            &Enrollment::new(holder_id, course.id),
            &Invoice::for_enrollment(holder_id, fee, today + chrono::Duration::days(30)),
            "INV",
        )
        .await
        .unwrap();
    invoice
}
