//! Admin Portal dashboard

use crate::dto::ApiResponse;
use crate::factory::ServiceFactory;
use actix_web::{web, HttpResponse};
use edufund_auth::StaffUser;
use edufund_core::AppError;
use tracing::instrument;

/// GET /api/v1/admin/dashboard
#[instrument(skip(factory, _user))]
pub async fn dashboard(
    factory: web::Data<ServiceFactory>,
    _user: StaffUser,
) -> Result<HttpResponse, AppError> {
    let summary = factory.dashboard().summary().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(summary)))
}

/// Mount `/dashboard`
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/dashboard", web::get().to(dashboard));
}
