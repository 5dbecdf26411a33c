//! Top-up rule handlers

use crate::dto::{
    parse_param, ApiResponse, PaginationParams, TopUpRuleCreateRequest, TopUpRuleListParams,
    TopUpRuleUpdateRequest,
};
use crate::factory::ServiceFactory;
use crate::handlers::{client_ip, record_audit};
use actix_web::{web, HttpRequest, HttpResponse};
use edufund_auth::{AdminUser, StaffUser};
use edufund_core::models::{AuditEntity, AuditLog};
use edufund_core::AppError;
use serde_json::json;
use tracing::{info, instrument};
use validator::Validate;

/// GET /api/v1/admin/top-up-rules
#[instrument(skip(factory, _user))]
pub async fn list_rules(
    factory: web::Data<ServiceFactory>,
    _user: StaffUser,
    params: web::Query<TopUpRuleListParams>,
    page: web::Query<PaginationParams>,
) -> Result<HttpResponse, AppError> {
    let status = parse_param("status", params.status.as_deref())?;
    let result = factory.top_ups().list(status, page.pagination()).await?;
    Ok(HttpResponse::Ok().json(result))
}

/// GET /api/v1/admin/top-up-rules/{id}
#[instrument(skip(factory, _user))]
pub async fn get_rule(
    factory: web::Data<ServiceFactory>,
    _user: StaffUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let rule = factory.top_ups().get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(rule)))
}

/// POST /api/v1/admin/top-up-rules
#[instrument(skip(factory, user, req))]
pub async fn create_rule(
    factory: web::Data<ServiceFactory>,
    user: AdminUser,
    req: web::Json<TopUpRuleCreateRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;

    let rule = factory
        .top_ups()
        .create(req.to_rule(), &user.username)
        .await?;

    record_audit(
        &factory,
        AuditLog::builder(&user.username, "create_top_up_rule", AuditEntity::TopUpRule)
            .entity_id(rule.id)
            .details(json!({
                "amount": rule.amount,
                "scheduled_date": rule.scheduled_date,
            }))
            .build(),
    )
    .await;

    Ok(HttpResponse::Created().json(ApiResponse::with_message(rule, "Top-up rule scheduled")))
}

/// PUT /api/v1/admin/top-up-rules/{id}
#[instrument(skip(factory, user, req))]
pub async fn update_rule(
    factory: web::Data<ServiceFactory>,
    user: AdminUser,
    path: web::Path<i32>,
    req: web::Json<TopUpRuleUpdateRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;
    let id = path.into_inner();

    let rule = factory
        .top_ups()
        .update(id, req.into_inner().into())
        .await?;

    record_audit(
        &factory,
        AuditLog::builder(&user.username, "update_top_up_rule", AuditEntity::TopUpRule)
            .entity_id(id)
            .build(),
    )
    .await;

    Ok(HttpResponse::Ok().json(ApiResponse::success(rule)))
}

/// POST /api/v1/admin/top-up-rules/{id}/execute
///
/// Runs the rule immediately instead of waiting for its scheduled date.
#[instrument(skip(factory, user, http_req))]
pub async fn execute_rule(
    factory: web::Data<ServiceFactory>,
    user: AdminUser,
    path: web::Path<i32>,
    http_req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let run = factory
        .top_ups()
        .execute(id, factory.today(), &user.username)
        .await?;

    info!(
        actor = %user.username,
        rule_id = id,
        batch_id = run.id,
        status = %run.status,
        affected = run.affected_count,
        "Top-up rule executed on demand"
    );
    record_audit(
        &factory,
        AuditLog::builder(&user.username, "execute_top_up_rule", AuditEntity::TopUpRule)
            .entity_id(id)
            .details(json!({
                "batch_execution_id": run.id,
                "status": run.status,
                "affected_count": run.affected_count,
            }))
            .ip_address(client_ip(&http_req))
            .build(),
    )
    .await;

    Ok(HttpResponse::Ok().json(ApiResponse::success(run)))
}

/// POST /api/v1/admin/top-up-rules/{id}/cancel
#[instrument(skip(factory, user))]
pub async fn cancel_rule(
    factory: web::Data<ServiceFactory>,
    user: AdminUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let rule = factory.top_ups().cancel(id).await?;

    record_audit(
        &factory,
        AuditLog::builder(&user.username, "cancel_top_up_rule", AuditEntity::TopUpRule)
            .entity_id(id)
            .build(),
    )
    .await;

    Ok(HttpResponse::Ok().json(ApiResponse::with_message(rule, "Top-up rule cancelled")))
}

/// Mount `/top-up-rules`
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/top-up-rules")
            .route("", web::get().to(list_rules))
            .route("", web::post().to(create_rule))
            .route("/{id}", web::get().to(get_rule))
            .route("/{id}", web::put().to(update_rule))
            .route("/{id}/execute", web::post().to(execute_rule))
            .route("/{id}/cancel", web::post().to(cancel_rule)),
    );
}
