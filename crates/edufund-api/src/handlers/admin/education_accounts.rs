//! Education account handlers for the Admin Portal

use crate::dto::{parse_param, AccountListParams, ApiResponse, PaginationParams, TopUpRequest, TransactionListParams};
use crate::factory::ServiceFactory;
use crate::handlers::{client_ip, record_audit};
use actix_web::{web, HttpRequest, HttpResponse};
use edufund_auth::{AdminUser, StaffUser};
use edufund_core::models::{AuditEntity, AuditLog};
use edufund_core::AppError;
use serde_json::json;
use tracing::{info, instrument};
use validator::Validate;

/// GET /api/v1/admin/education-accounts
#[instrument(skip(factory, _user))]
pub async fn list_accounts(
    factory: web::Data<ServiceFactory>,
    _user: StaffUser,
    params: web::Query<AccountListParams>,
    page: web::Query<PaginationParams>,
) -> Result<HttpResponse, AppError> {
    let status = parse_param("status", params.status.as_deref())?;
    let result = factory
        .education_accounts()
        .list(status, page.pagination())
        .await?;
    Ok(HttpResponse::Ok().json(result))
}

/// GET /api/v1/admin/education-accounts/{id}
#[instrument(skip(factory, _user))]
pub async fn get_account(
    factory: web::Data<ServiceFactory>,
    _user: StaffUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let account = factory.education_accounts().get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(account)))
}

/// POST /api/v1/admin/education-accounts/{id}/close
#[instrument(skip(factory, user, http_req))]
pub async fn close_account(
    factory: web::Data<ServiceFactory>,
    user: AdminUser,
    path: web::Path<i32>,
    http_req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let account = factory.education_accounts().close(id, &user.username).await?;

    info!(actor = %user.username, account_number = %account.account_number, "Account closed manually");
    record_audit(
        &factory,
        AuditLog::builder(&user.username, "close_account", AuditEntity::EducationAccount)
            .entity_id(id)
            .details(json!({ "balance": account.balance }))
            .ip_address(client_ip(&http_req))
            .build(),
    )
    .await;

    Ok(HttpResponse::Ok().json(ApiResponse::with_message(account, "Account closed")))
}

/// POST /api/v1/admin/education-accounts/{id}/reopen
#[instrument(skip(factory, user, http_req))]
pub async fn reopen_account(
    factory: web::Data<ServiceFactory>,
    user: AdminUser,
    path: web::Path<i32>,
    http_req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let account = factory.education_accounts().reopen(id).await?;

    info!(actor = %user.username, account_number = %account.account_number, "Account reopened");
    record_audit(
        &factory,
        AuditLog::builder(&user.username, "reopen_account", AuditEntity::EducationAccount)
            .entity_id(id)
            .ip_address(client_ip(&http_req))
            .build(),
    )
    .await;

    Ok(HttpResponse::Ok().json(ApiResponse::with_message(account, "Account reopened")))
}

/// POST /api/v1/admin/education-accounts/{id}/top-up
#[instrument(skip(factory, user, req, http_req))]
pub async fn top_up_account(
    factory: web::Data<ServiceFactory>,
    user: AdminUser,
    path: web::Path<i32>,
    req: web::Json<TopUpRequest>,
    http_req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    req.validate()?;
    let id = path.into_inner();
    let req = req.into_inner();

    let transaction = factory
        .education_accounts()
        .top_up(id, req.amount, req.description, &user.username)
        .await?;

    record_audit(
        &factory,
        AuditLog::builder(&user.username, "top_up_account", AuditEntity::EducationAccount)
            .entity_id(id)
            .details(json!({
                "amount": transaction.amount,
                "transaction_id": transaction.id,
            }))
            .ip_address(client_ip(&http_req))
            .build(),
    )
    .await;

    Ok(HttpResponse::Created().json(ApiResponse::with_message(transaction, "Account credited")))
}

/// GET /api/v1/admin/education-accounts/{id}/transactions
#[instrument(skip(factory, _user))]
pub async fn account_transactions(
    factory: web::Data<ServiceFactory>,
    _user: StaffUser,
    path: web::Path<i32>,
    params: web::Query<TransactionListParams>,
    page: web::Query<PaginationParams>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    // 404 for an unknown account rather than an empty page
    factory.education_accounts().get(id).await?;

    let mut query = params.to_query(&page)?;
    query.account_id = Some(id);
    let result = factory.transactions().list(&query).await?;
    Ok(HttpResponse::Ok().json(result))
}

/// Mount `/education-accounts`
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/education-accounts")
            .route("", web::get().to(list_accounts))
            .route("/{id}", web::get().to(get_account))
            .route("/{id}/close", web::post().to(close_account))
            .route("/{id}/reopen", web::post().to(reopen_account))
            .route("/{id}/top-up", web::post().to(top_up_account))
            .route("/{id}/transactions", web::get().to(account_transactions)),
    );
}
