//! Actix-web request extractors
//!
//! Admin Portal handlers take [`StaffUser`], [`AdminUser`] or
//! [`SuperadminUser`]; E-Service handlers take [`HolderUser`].

use crate::jwt::JwtService;
use crate::Claims;
use actix_web::{
    cookie::{time::Duration, Cookie},
    dev::Payload,
    web, FromRequest, HttpRequest,
};
use edufund_core::error::AppError;
use edufund_core::models::UserRole;
use futures::future::{ready, Ready};
use std::sync::Arc;
use tracing::{debug, warn};

/// Name of the session cookie shared by both portals
pub const TOKEN_COOKIE: &str = "token";

/// Extract JWT token from the `Authorization: Bearer` header, then the cookie
fn extract_token_from_request(req: &HttpRequest) -> Option<String> {
    let bearer = req
        .headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty());

    bearer.or_else(|| req.cookie(TOKEN_COOKIE).map(|c| c.value().to_string()))
}

/// Build the HTTP-only session cookie for a freshly issued token
pub fn session_cookie(token: String, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    Cookie::build(TOKEN_COOKIE, token)
        .path("/")
        .http_only(true)
        .secure(secure)
        .max_age(Duration::seconds(max_age_secs))
        .finish()
}

/// Cookie that clears the session on logout
pub fn clear_session_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build(TOKEN_COOKIE, "")
        .path("/")
        .http_only(true)
        .secure(secure)
        .max_age(Duration::seconds(0))
        .finish()
}

/// Any caller with a valid token, from either portal
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// Staff username or holder NRIC
    pub username: String,

    pub role: UserRole,

    /// Full claims from the JWT token
    pub claims: Claims,
}

impl AuthenticatedUser {
    pub fn user_role(&self) -> UserRole {
        self.role
    }

    pub fn is_admin(&self) -> bool {
        self.claims.is_admin()
    }

    pub fn is_superadmin(&self) -> bool {
        self.claims.is_superadmin()
    }

    /// Unix timestamp at which the session ends
    pub fn expires_at(&self) -> i64 {
        self.claims.exp
    }
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, AppError> {
    let jwt_service = req
        .app_data::<web::Data<Arc<JwtService>>>()
        .ok_or_else(|| {
            warn!("JwtService not found in app data");
            AppError::Internal("Authentication service not configured".to_string())
        })?;

    let token = extract_token_from_request(req).ok_or_else(|| {
        debug!("No authentication token found in request");
        AppError::InvalidToken("No authentication token provided".to_string())
    })?;

    let claims = jwt_service.validate_token(&token)?;

    Ok(AuthenticatedUser {
        username: claims.sub.clone(),
        role: claims.role,
        claims,
    })
}

/// Run `authenticate`, then a role check, as a ready future
fn guarded<T>(
    req: &HttpRequest,
    check: impl FnOnce(&AuthenticatedUser) -> bool,
    wrap: impl FnOnce(AuthenticatedUser) -> T,
    denied: &'static str,
) -> Ready<Result<T, actix_web::Error>> {
    let result = authenticate(req).and_then(|user| {
        if check(&user) {
            Ok(wrap(user))
        } else {
            warn!(subject = %user.username, role = %user.role, "{}", denied);
            Err(AppError::Forbidden)
        }
    });
    ready(result.map_err(actix_web::Error::from))
}

impl FromRequest for AuthenticatedUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req).map_err(actix_web::Error::from))
    }
}

macro_rules! session_extractor {
    ($(#[$meta:meta])* $name:ident, $check:expr, $denied:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name(pub AuthenticatedUser);

        impl std::ops::Deref for $name {
            type Target = AuthenticatedUser;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl FromRequest for $name {
            type Error = actix_web::Error;
            type Future = Ready<Result<Self, Self::Error>>;

            fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
                guarded(req, $check, $name, $denied)
            }
        }
    };
}

session_extractor!(
    /// Any Admin Portal staff session
    StaffUser,
    |user: &AuthenticatedUser| user.claims.is_staff(),
    "Non-staff session attempted Admin Portal access"
);

session_extractor!(
    /// Staff with admin or superadmin role
    AdminUser,
    |user: &AuthenticatedUser| user.claims.is_admin(),
    "User attempted admin access without privileges"
);

session_extractor!(
    /// Staff with superadmin role
    SuperadminUser,
    |user: &AuthenticatedUser| user.claims.is_superadmin(),
    "User attempted superadmin access without privileges"
);

/// E-Service session of an account holder
#[derive(Debug, Clone)]
pub struct HolderUser {
    pub holder_id: i32,
    pub nric: String,
    pub claims: Claims,
}

impl FromRequest for HolderUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = authenticate(req).and_then(|user| match user.claims.holder_id() {
            Some(holder_id) => Ok(HolderUser {
                holder_id,
                nric: user.username,
                claims: user.claims,
            }),
            None => {
                warn!(subject = %user.username, "Staff session attempted E-Service access");
                Err(AppError::Forbidden)
            }
        });
        ready(result.map_err(actix_web::Error::from))
    }
}
