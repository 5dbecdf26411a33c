//! Audit log handlers

use crate::dto::{AuditLogQueryParams, PaginationParams, AUDIT_MAX_PER_PAGE};
use crate::factory::ServiceFactory;
use actix_web::{web, HttpResponse};
use edufund_auth::SuperadminUser;
use edufund_core::traits::PaginatedResponse;
use edufund_core::AppError;
use tracing::{debug, instrument};

/// GET /api/v1/admin/audit-logs
///
/// Newest first, at most 100 entries per page.
#[instrument(skip(factory, _user))]
pub async fn list_audit_logs(
    factory: web::Data<ServiceFactory>,
    _user: SuperadminUser,
    params: web::Query<AuditLogQueryParams>,
    page: web::Query<PaginationParams>,
) -> Result<HttpResponse, AppError> {
    let filter = params.to_filter()?;
    if let (Some(start), Some(end)) = (filter.start_date, filter.end_date) {
        if start > end {
            return Err(AppError::Validation(
                "start_date must not be after end_date".to_string(),
            ));
        }
    }

    let pagination = page.pagination_capped(AUDIT_MAX_PER_PAGE);
    let (logs, total) = factory
        .audit_logs()
        .find_with_filters(&filter, pagination.limit(), pagination.offset())
        .await?;

    debug!("Audit log query matched {} entries", total);
    Ok(HttpResponse::Ok().json(PaginatedResponse::new(logs, total, pagination)))
}

/// Mount `/audit-logs`
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/audit-logs", web::get().to(list_audit_logs));
}
