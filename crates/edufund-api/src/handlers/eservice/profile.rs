//! The signed-in holder's own profile, account and enrollments

use crate::dto::{ApiResponse, ProfileUpdateRequest};
use crate::factory::ServiceFactory;
use crate::handlers::record_audit;
use actix_web::{web, HttpResponse};
use edufund_auth::HolderUser;
use edufund_core::models::{AuditEntity, AuditLog};
use edufund_core::AppError;
use tracing::instrument;
use validator::Validate;

/// GET /api/v1/eservice/profile
#[instrument(skip(factory, holder), fields(holder_id = holder.holder_id))]
pub async fn get_profile(
    factory: web::Data<ServiceFactory>,
    holder: HolderUser,
) -> Result<HttpResponse, AppError> {
    let profile = factory.account_holders().get(holder.holder_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(profile)))
}

/// PUT /api/v1/eservice/profile
///
/// Holders may change their contact details only.
#[instrument(skip(factory, holder, req), fields(holder_id = holder.holder_id))]
pub async fn update_profile(
    factory: web::Data<ServiceFactory>,
    holder: HolderUser,
    req: web::Json<ProfileUpdateRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;

    let profile = factory
        .account_holders()
        .update(holder.holder_id, req.into_inner().into_changes(), factory.today())
        .await?;

    record_audit(
        &factory,
        AuditLog::builder(&holder.nric, "eservice_update_profile", AuditEntity::AccountHolder)
            .entity_id(holder.holder_id)
            .build(),
    )
    .await;

    Ok(HttpResponse::Ok().json(ApiResponse::success(profile)))
}

/// GET /api/v1/eservice/account
#[instrument(skip(factory, holder), fields(holder_id = holder.holder_id))]
pub async fn get_account(
    factory: web::Data<ServiceFactory>,
    holder: HolderUser,
) -> Result<HttpResponse, AppError> {
    let account = factory
        .education_accounts()
        .get_by_holder(holder.holder_id)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(account)))
}

/// GET /api/v1/eservice/enrollments
#[instrument(skip(factory, holder), fields(holder_id = holder.holder_id))]
pub async fn list_enrollments(
    factory: web::Data<ServiceFactory>,
    holder: HolderUser,
) -> Result<HttpResponse, AppError> {
    let enrollments = factory
        .enrollments()
        .list_for_holder(holder.holder_id)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(enrollments)))
}

/// Mount the holder profile and account routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/profile", web::get().to(get_profile))
        .route("/profile", web::put().to(update_profile))
        .route("/account", web::get().to(get_account))
        .route("/enrollments", web::get().to(list_enrollments));
}
