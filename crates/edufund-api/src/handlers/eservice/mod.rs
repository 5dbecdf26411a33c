//! E-Service routes under `/api/v1/eservice`
//!
//! Every route except login requires a holder session, and every query is
//! scoped to the session's own holder id.

pub mod auth;
pub mod billing;
pub mod profile;

use actix_web::web;

/// Mount the E-Service portal under `/eservice`
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/eservice")
            .configure(auth::configure)
            .configure(profile::configure)
            .configure(billing::configure),
    );
}
