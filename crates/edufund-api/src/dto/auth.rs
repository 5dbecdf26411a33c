//! Authentication DTOs
//!
//! Request and response types for the sign-in endpoints of both portals.

use edufund_core::models::{AccountHolder, UserInfo};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Admin Portal login request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    /// Staff username
    #[validate(length(min = 1, max = 100, message = "Username is required"))]
    pub username: String,

    /// Plain-text password
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// E-Service login request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct HolderLoginRequest {
    /// Holder NRIC
    #[validate(length(min = 1, max = 20, message = "NRIC is required"))]
    pub nric: String,

    /// E-Service password
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Admin Portal login response
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    /// Access token (JWT)
    pub access_token: String,

    /// Token type (always "Bearer")
    pub token_type: String,

    /// Token expiration time in seconds
    pub expires_in: i64,

    /// Signed-in staff user
    pub user: UserInfo,
}

impl LoginResponse {
    /// Bearer response for a staff session
    pub fn new(access_token: String, expires_in: i64, user: UserInfo) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in,
            user,
        }
    }
}

/// Signed-in holder as shown in the E-Service header
#[derive(Debug, Clone, Serialize)]
pub struct HolderSession {
    /// Holder id
    pub holder_id: i32,
    /// Holder NRIC
    pub nric: String,
    /// Holder full name
    pub full_name: String,
}

impl From<&AccountHolder> for HolderSession {
    fn from(holder: &AccountHolder) -> Self {
        Self {
            holder_id: holder.id,
            nric: holder.nric.clone(),
            full_name: holder.full_name.clone(),
        }
    }
}

/// E-Service login response
#[derive(Debug, Clone, Serialize)]
pub struct HolderLoginResponse {
    /// Access token (JWT)
    pub access_token: String,
    /// Token type (always "Bearer")
    pub token_type: String,
    /// Token expiration time in seconds
    pub expires_in: i64,
    /// Signed-in holder
    pub holder: HolderSession,
}

impl HolderLoginResponse {
    /// Bearer response for a holder session
    pub fn new(access_token: String, expires_in: i64, holder: HolderSession) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in,
            holder,
        }
    }
}

/// Current staff user response
#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    /// Signed-in staff user
    pub user: UserInfo,

    /// Token expiration timestamp
    pub token_expires_at: DateTime<Utc>,
}

/// Password change request, shared by both portals
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    /// Password being replaced
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    /// Replacement password
    #[validate(length(min = 8, message = "New password must be at least 8 characters"))]
    pub new_password: String,
}
