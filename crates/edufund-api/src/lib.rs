//! HTTP API layer for EduFund
//!
//! Routes for the Admin Portal (`/api/v1/admin`), the account-holder
//! E-Service portal (`/api/v1/eservice`) and the health probe.

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    missing_docs
)]

pub mod dto;
pub mod factory;
pub mod handlers;

use actix_web::{error::InternalError, web, HttpResponse};
use edufund_core::AppError;

pub use dto::{ApiResponse, PaginationParams};
pub use factory::ServiceFactory;
pub use handlers::{configure_admin, configure_eservice, configure_health};

/// Mount every route under `/api/v1`
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(configure_health)
            .configure(configure_admin)
            .configure(configure_eservice),
    );
}

fn bad_request(err: impl std::fmt::Display) -> HttpResponse {
    actix_web::ResponseError::error_response(&AppError::InvalidInput(err.to_string()))
}

/// JSON body errors in the standard error envelope
pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(|err, _req| {
            let response = bad_request(&err);
            InternalError::from_response(err, response).into()
        })
}

/// Query-string errors in the standard error envelope
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        let response = bad_request(&err);
        InternalError::from_response(err, response).into()
    })
}

/// Malformed path segments (e.g. a non-numeric id) as 400
pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req| {
        let response = bad_request(&err);
        InternalError::from_response(err, response).into()
    })
}
