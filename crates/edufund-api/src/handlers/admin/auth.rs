//! Admin Portal authentication handlers

use crate::dto::{ApiResponse, ChangePasswordRequest, LoginRequest, LoginResponse, MeResponse, MessageResponse};
use crate::factory::ServiceFactory;
use crate::handlers::{client_ip, record_audit};
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use edufund_auth::{clear_session_cookie, session_cookie, JwtService, PasswordService, StaffUser};
use edufund_core::models::{AuditEntity, AuditLog, UserInfo};
use edufund_core::traits::UserRepository;
use edufund_core::AppError;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

/// POST /api/v1/admin/auth/login
#[instrument(skip(factory, jwt_service, password_service, req, http_req))]
pub async fn login(
    factory: web::Data<ServiceFactory>,
    jwt_service: web::Data<Arc<JwtService>>,
    password_service: web::Data<Arc<PasswordService>>,
    req: web::Json<LoginRequest>,
    http_req: HttpRequest,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Login validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let username = req.username.trim();
    debug!(username = %username, "Processing staff login");

    let users = factory.users();
    let user = users.find_by_username(username).await?.ok_or_else(|| {
        info!(username = %username, "Login failed: user not found");
        AppError::InvalidCredentials
    })?;

    if !user.can_login() {
        warn!(username = %username, "Login failed: user is inactive");
        return Err(AppError::InvalidCredentials);
    }

    password_service
        .check_credentials(&req.password, Some(&user.password_hash))
        .map_err(|e| {
            info!(username = %username, "Login failed: invalid password");
            e
        })?;

    if let Err(e) = users.update_last_login(user.id).await {
        warn!("Failed to update last login for user {}: {}", user.id, e);
    }

    let token = jwt_service.create_staff_token(&user.username, user.role)?;
    let expires_in = jwt_service.staff_token_secs();

    info!(username = %username, role = %user.role, "Login successful");

    record_audit(
        &factory,
        AuditLog::builder(&user.username, "login", AuditEntity::Session)
            .ip_address(client_ip(&http_req))
            .build(),
    )
    .await;

    let cookie = session_cookie(token.clone(), expires_in, factory.config().auth.secure_cookies);
    let response = LoginResponse::new(token, expires_in, UserInfo::from(&user));

    Ok(HttpResponse::Ok()
        .cookie(cookie)
        .json(ApiResponse::success(response)))
}

/// POST /api/v1/admin/auth/logout
#[instrument(skip(factory, user))]
pub async fn logout(factory: web::Data<ServiceFactory>, user: StaffUser) -> HttpResponse {
    info!(username = %user.username, "User logged out");

    record_audit(
        &factory,
        AuditLog::builder(&user.username, "logout", AuditEntity::Session).build(),
    )
    .await;

    HttpResponse::Ok()
        .cookie(clear_session_cookie(factory.config().auth.secure_cookies))
        .json(ApiResponse::success(MessageResponse::new("Logged out successfully")))
}

/// GET /api/v1/admin/auth/me
#[instrument(skip(factory, user))]
pub async fn me(factory: web::Data<ServiceFactory>, user: StaffUser) -> Result<HttpResponse, AppError> {
    let db_user = factory
        .users()
        .find_by_username(&user.username)
        .await?
        .ok_or_else(|| AppError::UserNotFound(user.username.clone()))?;

    let token_expires_at =
        DateTime::<Utc>::from_timestamp(user.expires_at(), 0).unwrap_or_else(Utc::now);

    Ok(HttpResponse::Ok().json(ApiResponse::success(MeResponse {
        user: UserInfo::from(&db_user),
        token_expires_at,
    })))
}

/// POST /api/v1/admin/auth/change-password
#[instrument(skip(factory, password_service, user, req))]
pub async fn change_password(
    factory: web::Data<ServiceFactory>,
    password_service: web::Data<Arc<PasswordService>>,
    user: StaffUser,
    req: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;

    let users = factory.users();
    let db_user = users
        .find_by_username(&user.username)
        .await?
        .ok_or_else(|| AppError::UserNotFound(user.username.clone()))?;

    password_service.check_credentials(&req.current_password, Some(&db_user.password_hash))?;
    let new_hash = password_service.hash_new_password(&req.new_password)?;
    users.update_password(db_user.id, &new_hash).await?;

    info!(username = %user.username, "Password changed");
    record_audit(
        &factory,
        AuditLog::builder(&user.username, "change_password", AuditEntity::User)
            .entity_id(db_user.id)
            .build(),
    )
    .await;

    Ok(HttpResponse::Ok().json(ApiResponse::success(MessageResponse::new(
        "Password changed successfully",
    ))))
}

/// Mount the staff `/auth` routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/login", web::post().to(login))
            .route("/logout", web::post().to(logout))
            .route("/me", web::get().to(me))
            .route("/change-password", web::post().to(change_password)),
    );
}
