//! Enrollment handlers for the Admin Portal

use crate::dto::{ApiResponse, EnrollRequest, EnrollmentCreated};
use crate::factory::ServiceFactory;
use crate::handlers::record_audit;
use actix_web::{web, HttpResponse};
use edufund_auth::StaffUser;
use edufund_core::models::{AuditEntity, AuditLog, Enrollment};
use edufund_core::AppError;
use serde_json::json;
use tracing::{info, instrument};
use validator::Validate;

/// POST /api/v1/admin/enrollments
///
/// Enrolls the holder and issues the course fee invoice.
#[instrument(skip(factory, user, req))]
pub async fn enroll(
    factory: web::Data<ServiceFactory>,
    user: StaffUser,
    req: web::Json<EnrollRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;

    let (enrollment, invoice) = factory
        .enrollments()
        .enroll(req.holder_id, req.course_id, factory.today())
        .await?;

    info!(
        actor = %user.username,
        holder_id = enrollment.holder_id,
        invoice_number = %invoice.invoice_number,
        "Holder enrolled"
    );
    record_audit(
        &factory,
        AuditLog::builder(&user.username, "enroll", AuditEntity::Enrollment)
            .entity_id(enrollment.id)
            .details(json!({
                "holder_id": enrollment.holder_id,
                "course_id": enrollment.course_id,
                "invoice_id": invoice.id,
                "amount": invoice.amount,
            }))
            .build(),
    )
    .await;

    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        EnrollmentCreated { enrollment, invoice },
        "Enrollment created",
    )))
}

async fn finish_enrollment(
    factory: &ServiceFactory,
    actor: &str,
    enrollment: Enrollment,
    action: &str,
) -> HttpResponse {
    record_audit(
        factory,
        AuditLog::builder(actor, action, AuditEntity::Enrollment)
            .entity_id(enrollment.id)
            .details(json!({ "status": enrollment.status }))
            .build(),
    )
    .await;

    HttpResponse::Ok().json(ApiResponse::success(enrollment))
}

/// POST /api/v1/admin/enrollments/{id}/withdraw
#[instrument(skip(factory, user))]
pub async fn withdraw(
    factory: web::Data<ServiceFactory>,
    user: StaffUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let enrollment = factory.enrollments().withdraw(path.into_inner()).await?;
    Ok(finish_enrollment(&factory, &user.username, enrollment, "withdraw_enrollment").await)
}

/// POST /api/v1/admin/enrollments/{id}/complete
#[instrument(skip(factory, user))]
pub async fn complete(
    factory: web::Data<ServiceFactory>,
    user: StaffUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let enrollment = factory.enrollments().complete(path.into_inner()).await?;
    Ok(finish_enrollment(&factory, &user.username, enrollment, "complete_enrollment").await)
}

/// Mount `/enrollments`
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/enrollments")
            .route("", web::post().to(enroll))
            .route("/{id}/withdraw", web::post().to(withdraw))
            .route("/{id}/complete", web::post().to(complete)),
    );
}
