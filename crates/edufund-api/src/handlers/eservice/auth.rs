//! E-Service authentication for account holders

use crate::dto::{ApiResponse, ChangePasswordRequest, HolderLoginRequest, HolderLoginResponse, HolderSession, MessageResponse};
use crate::factory::ServiceFactory;
use crate::handlers::{client_ip, record_audit};
use actix_web::{web, HttpRequest, HttpResponse};
use edufund_auth::{clear_session_cookie, session_cookie, HolderUser, JwtService, PasswordService};
use edufund_core::models::{AuditEntity, AuditLog};
use edufund_core::AppError;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

/// POST /api/v1/eservice/auth/login
///
/// Unknown NRIC, holders without a password and wrong passwords all
/// produce the same `invalid_credentials` error.
#[instrument(skip(factory, jwt_service, password_service, req, http_req))]
pub async fn login(
    factory: web::Data<ServiceFactory>,
    jwt_service: web::Data<Arc<JwtService>>,
    password_service: web::Data<Arc<PasswordService>>,
    req: web::Json<HolderLoginRequest>,
    http_req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    req.validate()?;

    let holder = factory
        .account_holders()
        .find_by_nric(&req.nric)
        .await?
        .ok_or_else(|| {
            info!("E-Service login failed: unknown NRIC");
            AppError::InvalidCredentials
        })?;

    password_service
        .check_credentials(&req.password, holder.password_hash.as_deref())
        .map_err(|e| {
            warn!(holder_id = holder.id, "E-Service login failed");
            e
        })?;

    let token = jwt_service.create_holder_token(holder.id, &holder.nric)?;
    let expires_in = jwt_service.holder_token_secs();

    info!(holder_id = holder.id, "E-Service login successful");
    record_audit(
        &factory,
        AuditLog::builder(&holder.nric, "eservice_login", AuditEntity::Session)
            .entity_id(holder.id)
            .ip_address(client_ip(&http_req))
            .build(),
    )
    .await;

    let cookie = session_cookie(token.clone(), expires_in, factory.config().auth.secure_cookies);
    let response = HolderLoginResponse::new(token, expires_in, HolderSession::from(&holder));

    Ok(HttpResponse::Ok()
        .cookie(cookie)
        .json(ApiResponse::success(response)))
}

/// POST /api/v1/eservice/auth/logout
#[instrument(skip(factory, holder))]
pub async fn logout(factory: web::Data<ServiceFactory>, holder: HolderUser) -> HttpResponse {
    record_audit(
        &factory,
        AuditLog::builder(&holder.nric, "eservice_logout", AuditEntity::Session)
            .entity_id(holder.holder_id)
            .build(),
    )
    .await;

    HttpResponse::Ok()
        .cookie(clear_session_cookie(factory.config().auth.secure_cookies))
        .json(ApiResponse::success(MessageResponse::new("Logged out successfully")))
}

/// POST /api/v1/eservice/auth/change-password
#[instrument(skip(factory, password_service, holder, req))]
pub async fn change_password(
    factory: web::Data<ServiceFactory>,
    password_service: web::Data<Arc<PasswordService>>,
    holder: HolderUser,
    req: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;

    let holders = factory.account_holders();
    let current = holders.get(holder.holder_id).await?;

    password_service.check_credentials(&req.current_password, current.password_hash.as_deref())?;
    let new_hash = password_service.hash_new_password(&req.new_password)?;
    holders.set_password(holder.holder_id, Some(new_hash)).await?;

    record_audit(
        &factory,
        AuditLog::builder(&holder.nric, "eservice_change_password", AuditEntity::AccountHolder)
            .entity_id(holder.holder_id)
            .build(),
    )
    .await;

    Ok(HttpResponse::Ok().json(ApiResponse::success(MessageResponse::new(
        "Password changed successfully",
    ))))
}

/// Mount the holder `/auth` routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/login", web::post().to(login))
            .route("/logout", web::post().to(logout))
            .route("/change-password", web::post().to(change_password)),
    );
}
