//! Authentication and authorization for the EduFund portals
//!
//! JWT sessions for Admin Portal staff and E-Service account holders,
//! Argon2 password hashing, and Actix-web extractors that enforce the
//! portal and role of the caller.
//!
//! ```no_run
//! use actix_web::HttpResponse;
//! use edufund_auth::{AdminUser, HolderUser};
//!
//! async fn close_account(admin: AdminUser) -> HttpResponse {
//!     HttpResponse::Ok().body(admin.username.clone())
//! }
//!
//! async fn my_account(holder: HolderUser) -> HttpResponse {
//!     HttpResponse::Ok().body(holder.holder_id.to_string())
//! }
//! ```

pub mod claims;
pub mod jwt;
pub mod middleware;
pub mod password;

pub use claims::Claims;
pub use jwt::JwtService;
pub use middleware::{
    clear_session_cookie, session_cookie, AdminUser, AuthenticatedUser, HolderUser, StaffUser,
    SuperadminUser, TOKEN_COOKIE,
};
pub use password::{PasswordService, MIN_PASSWORD_LEN};

#[cfg(test)]
mod tests {
    use super::*;
    use edufund_core::models::UserRole;

    #[test]
    fn test_login_flow_for_both_portals() {
        let password_service = PasswordService::new();
        let jwt_service = JwtService::new("test-secret-key-12345", 1800, 900);

        let staff_hash = password_service.hash_password("staff-password").unwrap();
        password_service
            .check_credentials("staff-password", Some(&staff_hash))
            .unwrap();
        let token = jwt_service
            .create_staff_token("ops1", UserRole::Operator)
            .unwrap();
        let claims = jwt_service.validate_token(&token).unwrap();
        assert!(claims.is_staff());

        let holder_hash = password_service.hash_password("holder-password").unwrap();
        password_service
            .check_credentials("holder-password", Some(&holder_hash))
            .unwrap();
        let token = jwt_service.create_holder_token(12, "S9876543C").unwrap();
        let claims = jwt_service.validate_token(&token).unwrap();
        assert_eq!(claims.holder_id(), Some(12));
    }
}
