//! Course catalogue handlers

use crate::dto::{ApiResponse, CourseCreateRequest, CourseListParams, CourseUpdateRequest, MessageResponse, PaginationParams};
use crate::factory::ServiceFactory;
use crate::handlers::record_audit;
use actix_web::{web, HttpResponse};
use edufund_auth::{AdminUser, StaffUser};
use edufund_core::models::{AuditEntity, AuditLog};
use edufund_core::AppError;
use serde_json::json;
use tracing::{info, instrument};
use validator::Validate;

/// GET /api/v1/admin/courses
#[instrument(skip(factory, _user))]
pub async fn list_courses(
    factory: web::Data<ServiceFactory>,
    _user: StaffUser,
    params: web::Query<CourseListParams>,
    page: web::Query<PaginationParams>,
) -> Result<HttpResponse, AppError> {
    let query = params.to_query(&page)?;
    let result = factory.courses().list(&query).await?;
    Ok(HttpResponse::Ok().json(result))
}

/// GET /api/v1/admin/courses/{id}
#[instrument(skip(factory, _user))]
pub async fn get_course(
    factory: web::Data<ServiceFactory>,
    _user: StaffUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let course = factory.courses().get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(course)))
}

/// POST /api/v1/admin/courses
#[instrument(skip(factory, user, req))]
pub async fn create_course(
    factory: web::Data<ServiceFactory>,
    user: StaffUser,
    req: web::Json<CourseCreateRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;

    let course = factory.courses().create(req.to_course()).await?;

    info!(actor = %user.username, course_code = %course.course_code, "Course created");
    record_audit(
        &factory,
        AuditLog::builder(&user.username, "create_course", AuditEntity::Course)
            .entity_id(course.id)
            .details(json!({ "course_code": course.course_code, "fee": course.fee }))
            .build(),
    )
    .await;

    Ok(HttpResponse::Created().json(ApiResponse::with_message(course, "Course created")))
}

/// PUT /api/v1/admin/courses/{id}
#[instrument(skip(factory, user, req))]
pub async fn update_course(
    factory: web::Data<ServiceFactory>,
    user: StaffUser,
    path: web::Path<i32>,
    req: web::Json<CourseUpdateRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;
    let id = path.into_inner();

    let course = factory
        .courses()
        .update(id, req.into_inner().into())
        .await?;

    record_audit(
        &factory,
        AuditLog::builder(&user.username, "update_course", AuditEntity::Course)
            .entity_id(id)
            .details(json!({ "status": course.status, "fee": course.fee }))
            .build(),
    )
    .await;

    Ok(HttpResponse::Ok().json(ApiResponse::success(course)))
}

/// DELETE /api/v1/admin/courses/{id}
///
/// Refused while the course still has active enrollments.
#[instrument(skip(factory, user))]
pub async fn delete_course(
    factory: web::Data<ServiceFactory>,
    user: AdminUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    factory.courses().delete(id).await?;

    info!(actor = %user.username, course_id = id, "Course deleted");
    record_audit(
        &factory,
        AuditLog::builder(&user.username, "delete_course", AuditEntity::Course)
            .entity_id(id)
            .build(),
    )
    .await;

    Ok(HttpResponse::Ok().json(ApiResponse::success(MessageResponse::new("Course deleted"))))
}

/// Mount `/courses`
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/courses")
            .route("", web::get().to(list_courses))
            .route("", web::post().to(create_course))
            .route("/{id}", web::get().to(get_course))
            .route("/{id}", web::put().to(update_course))
            .route("/{id}", web::delete().to(delete_course)),
    );
}
