//! Liveness and database reachability

use crate::factory::ServiceFactory;
use actix_web::{web, HttpResponse};
use edufund_db::ping;
use serde_json::json;

/// GET /api/v1/health
///
/// Always 200 while the process is up; `database` reports pool reachability.
pub async fn health_check(factory: web::Data<ServiceFactory>) -> HttpResponse {
    let database = if ping(factory.pool()).await {
        "up"
    } else {
        "down"
    };

    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": "edufund",
        "database": database,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Mount `/health`
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check));
}
