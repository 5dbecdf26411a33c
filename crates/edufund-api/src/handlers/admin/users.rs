//! Staff user management (superadmin only)

use crate::dto::{ApiResponse, MessageResponse, PaginationParams, UserCreateRequest, UserResponse, UserUpdateRequest};
use crate::factory::ServiceFactory;
use crate::handlers::record_audit;
use actix_web::{web, HttpResponse};
use edufund_auth::{PasswordService, SuperadminUser};
use edufund_core::models::{AuditEntity, AuditLog};
use edufund_core::traits::{PaginatedResponse, Repository, UserRepository};
use edufund_core::AppError;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

/// GET /api/v1/admin/users
#[instrument(skip(factory, _user))]
pub async fn list_users(
    factory: web::Data<ServiceFactory>,
    _user: SuperadminUser,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse, AppError> {
    let pagination = query.pagination();
    let users = factory.users();

    let rows = users.find_all(pagination.limit(), pagination.offset()).await?;
    let total = users.count().await?;

    let data: Vec<UserResponse> = rows.into_iter().map(UserResponse::from).collect();
    Ok(HttpResponse::Ok().json(PaginatedResponse::new(data, total, pagination)))
}

/// POST /api/v1/admin/users
#[instrument(skip(factory, password_service, user, req))]
pub async fn create_user(
    factory: web::Data<ServiceFactory>,
    password_service: web::Data<Arc<PasswordService>>,
    user: SuperadminUser,
    req: web::Json<UserCreateRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;

    if !user.role.can_manage(&req.role) {
        warn!(actor = %user.username, role = %req.role, "Refused to create user with this role");
        return Err(AppError::Forbidden);
    }

    let hash = password_service.hash_new_password(&req.password)?;
    let created = factory.users().create(&req.to_user(hash)).await?;

    info!(actor = %user.username, username = %created.username, role = %created.role, "User created");
    record_audit(
        &factory,
        AuditLog::builder(&user.username, "create_user", AuditEntity::User)
            .entity_id(created.id)
            .details(json!({ "username": created.username, "role": created.role }))
            .build(),
    )
    .await;

    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        UserResponse::from(created),
        "User created successfully",
    )))
}

/// PUT /api/v1/admin/users/{id}
#[instrument(skip(factory, password_service, user, req))]
pub async fn update_user(
    factory: web::Data<ServiceFactory>,
    password_service: web::Data<Arc<PasswordService>>,
    user: SuperadminUser,
    path: web::Path<i32>,
    req: web::Json<UserUpdateRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;
    let id = path.into_inner();
    let req = req.into_inner();

    let users = factory.users();
    let mut existing = users
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::UserNotFound(id.to_string()))?;

    if existing.username == user.username {
        if req.role.is_some_and(|r| r != existing.role) || req.is_active == Some(false) {
            return Err(AppError::Conflict(
                "Cannot change your own role or deactivate yourself".to_string(),
            ));
        }
    } else if !user.role.can_manage(&existing.role) {
        return Err(AppError::Forbidden);
    }

    if let Some(role) = req.role {
        if role != existing.role && !user.role.can_manage(&role) {
            return Err(AppError::Forbidden);
        }
        existing.role = role;
    }
    if let Some(full_name) = req.full_name {
        existing.full_name = Some(full_name);
    }
    if let Some(email) = req.email {
        existing.email = Some(email);
    }
    if let Some(is_active) = req.is_active {
        existing.is_active = is_active;
    }

    let updated = users.update(&existing).await?;

    let password_reset = match req.password {
        Some(password) => {
            let hash = password_service.hash_new_password(&password)?;
            users.update_password(id, &hash).await?
        }
        None => false,
    };

    info!(actor = %user.username, user_id = id, "User updated");
    record_audit(
        &factory,
        AuditLog::builder(&user.username, "update_user", AuditEntity::User)
            .entity_id(id)
            .details(json!({
                "role": updated.role,
                "is_active": updated.is_active,
                "password_reset": password_reset,
            }))
            .build(),
    )
    .await;

    Ok(HttpResponse::Ok().json(ApiResponse::success(UserResponse::from(updated))))
}

/// DELETE /api/v1/admin/users/{id}
#[instrument(skip(factory, user))]
pub async fn delete_user(
    factory: web::Data<ServiceFactory>,
    user: SuperadminUser,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let users = factory.users();

    let existing = users
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::UserNotFound(id.to_string()))?;

    if existing.username == user.username {
        return Err(AppError::Conflict("Cannot delete your own account".to_string()));
    }
    if !user.role.can_manage(&existing.role) {
        return Err(AppError::Forbidden);
    }

    if !users.delete(id).await? {
        return Err(AppError::UserNotFound(id.to_string()));
    }

    info!(actor = %user.username, username = %existing.username, "User deleted");
    record_audit(
        &factory,
        AuditLog::builder(&user.username, "delete_user", AuditEntity::User)
            .entity_id(id)
            .details(json!({ "username": existing.username }))
            .build(),
    )
    .await;

    Ok(HttpResponse::Ok().json(ApiResponse::success(MessageResponse::new(
        "User deleted successfully",
    ))))
}

/// Mount `/users`
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .route("", web::get().to(list_users))
            .route("", web::post().to(create_user))
            .route("/{id}", web::put().to(update_user))
            .route("/{id}", web::delete().to(delete_user)),
    );
}
