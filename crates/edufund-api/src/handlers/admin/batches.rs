//! Batch execution history and manual runs

use crate::dto::{ApiResponse, BatchListParams, PaginationParams};
use crate::factory::ServiceFactory;
use crate::handlers::record_audit;
use actix_web::{web, HttpResponse};
use edufund_auth::{AdminUser, StaffUser};
use edufund_core::models::{AuditEntity, AuditLog};
use edufund_core::AppError;
use serde_json::json;
use tracing::{info, instrument};

/// GET /api/v1/admin/batch-executions
#[instrument(skip(factory, _user))]
pub async fn list_executions(
    factory: web::Data<ServiceFactory>,
    _user: StaffUser,
    params: web::Query<BatchListParams>,
    page: web::Query<PaginationParams>,
) -> Result<HttpResponse, AppError> {
    let query = params.to_query(&page)?;
    let result = factory.batch_executions().list(&query).await?;
    Ok(HttpResponse::Ok().json(result))
}

/// GET /api/v1/admin/batch-executions/{id}
#[instrument(skip(factory, _user))]
pub async fn get_execution(
    factory: web::Data<ServiceFactory>,
    _user: StaffUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let run = factory.batch_executions().get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(run)))
}

/// POST /api/v1/admin/batch-executions/account-closure
///
/// Runs the age-based closure job now. The run is recorded even when
/// nothing is due.
#[instrument(skip(factory, user))]
pub async fn run_account_closure(
    factory: web::Data<ServiceFactory>,
    user: AdminUser,
) -> Result<HttpResponse, AppError> {
    let run = factory
        .education_accounts()
        .auto_close(factory.today(), &user.username)
        .await?;

    info!(
        actor = %user.username,
        batch_id = run.id,
        status = %run.status,
        affected = run.affected_count,
        "Account closure run on demand"
    );
    record_audit(
        &factory,
        AuditLog::builder(&user.username, "run_account_closure", AuditEntity::BatchExecution)
            .entity_id(run.id)
            .details(json!({
                "status": run.status,
                "processed_count": run.processed_count,
                "affected_count": run.affected_count,
            }))
            .build(),
    )
    .await;

    Ok(HttpResponse::Ok().json(ApiResponse::success(run)))
}

/// Mount `/batch-executions` and the manual batch triggers
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/batch-executions")
            .route("", web::get().to(list_executions))
            .route("/account-closure", web::post().to(run_account_closure))
            .route("/{id}", web::get().to(get_execution)),
    );
}
