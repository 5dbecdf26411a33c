//! Account holder handlers for the Admin Portal

use crate::dto::{
    AccountHolderCreateRequest, AccountHolderCreated, AccountHolderListParams,
    AccountHolderUpdateRequest, ApiResponse, MessageResponse, PaginationParams, SetPasswordRequest,
};
use crate::factory::ServiceFactory;
use crate::handlers::{client_ip, record_audit};
use actix_web::{web, HttpRequest, HttpResponse};
use edufund_auth::{PasswordService, StaffUser};
use edufund_core::models::{AuditEntity, AuditLog};
use edufund_core::AppError;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

/// GET /api/v1/admin/account-holders
#[instrument(skip(factory, _user))]
pub async fn list_holders(
    factory: web::Data<ServiceFactory>,
    _user: StaffUser,
    params: web::Query<AccountHolderListParams>,
    page: web::Query<PaginationParams>,
) -> Result<HttpResponse, AppError> {
    let query = params.to_query(&page, factory.today())?;
    let result = factory.account_holders().list(&query).await?;
    Ok(HttpResponse::Ok().json(result))
}

/// GET /api/v1/admin/account-holders/{id}
#[instrument(skip(factory, _user))]
pub async fn get_holder(
    factory: web::Data<ServiceFactory>,
    _user: StaffUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let detail = factory.account_holders().get_detail(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(detail)))
}

/// POST /api/v1/admin/account-holders
///
/// Registers the holder and opens their education account.
#[instrument(skip(factory, user, req, http_req))]
pub async fn create_holder(
    factory: web::Data<ServiceFactory>,
    user: StaffUser,
    req: web::Json<AccountHolderCreateRequest>,
    http_req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    req.validate()?;

    let (holder, account) = factory
        .account_holders()
        .create(req.to_holder(), factory.today())
        .await?;

    record_audit(
        &factory,
        AuditLog::builder(&user.username, "create_account_holder", AuditEntity::AccountHolder)
            .entity_id(holder.id)
            .details(json!({ "account_number": account.account_number }))
            .ip_address(client_ip(&http_req))
            .build(),
    )
    .await;

    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        AccountHolderCreated { holder, account },
        "Account holder registered",
    )))
}

/// PUT /api/v1/admin/account-holders/{id}
#[instrument(skip(factory, user, req))]
pub async fn update_holder(
    factory: web::Data<ServiceFactory>,
    user: StaffUser,
    path: web::Path<i32>,
    req: web::Json<AccountHolderUpdateRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;
    let id = path.into_inner();

    let holder = factory
        .account_holders()
        .update(id, req.into_inner().into_changes(), factory.today())
        .await?;

    info!(actor = %user.username, holder_id = id, "Account holder updated");
    record_audit(
        &factory,
        AuditLog::builder(&user.username, "update_account_holder", AuditEntity::AccountHolder)
            .entity_id(id)
            .build(),
    )
    .await;

    Ok(HttpResponse::Ok().json(ApiResponse::success(holder)))
}

/// POST /api/v1/admin/account-holders/{id}/password
///
/// A null password disables E-Service login for the holder.
#[instrument(skip(factory, password_service, user, req))]
pub async fn set_holder_password(
    factory: web::Data<ServiceFactory>,
    password_service: web::Data<Arc<PasswordService>>,
    user: StaffUser,
    path: web::Path<i32>,
    req: web::Json<SetPasswordRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;
    let id = path.into_inner();

    let hash = match req.password.as_deref() {
        Some(password) => Some(password_service.hash_new_password(password)?),
        None => None,
    };
    let enabled = hash.is_some();
    factory.account_holders().set_password(id, hash).await?;

    record_audit(
        &factory,
        AuditLog::builder(&user.username, "set_holder_password", AuditEntity::AccountHolder)
            .entity_id(id)
            .details(json!({ "eservice_enabled": enabled }))
            .build(),
    )
    .await;

    let message = if enabled {
        "E-Service password set"
    } else {
        "E-Service access disabled"
    };
    Ok(HttpResponse::Ok().json(ApiResponse::success(MessageResponse::new(message))))
}

/// Mount `/account-holders`
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/account-holders")
            .route("", web::get().to(list_holders))
            .route("", web::post().to(create_holder))
            .route("/{id}", web::get().to(get_holder))
            .route("/{id}", web::put().to(update_holder))
            .route("/{id}/password", web::post().to(set_holder_password)),
    );
}
