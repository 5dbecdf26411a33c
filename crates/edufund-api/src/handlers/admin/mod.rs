//! Admin Portal routes under `/api/v1/admin`
//!
//! Every route requires a staff session. Destructive operations require the
//! `admin` role; user management and audit logs require `superadmin`.

pub mod account_holders;
pub mod audit_logs;
pub mod auth;
pub mod batches;
pub mod billing;
pub mod courses;
pub mod dashboard;
pub mod education_accounts;
pub mod enrollments;
pub mod top_up_rules;
pub mod users;

use actix_web::web;

/// Mount the Admin Portal under `/admin`
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .configure(auth::configure)
            .configure(users::configure)
            .configure(account_holders::configure)
            .configure(education_accounts::configure)
            .configure(courses::configure)
            .configure(enrollments::configure)
            .configure(billing::configure)
            .configure(top_up_rules::configure)
            .configure(batches::configure)
            .configure(dashboard::configure)
            .configure(audit_logs::configure),
    );
}
