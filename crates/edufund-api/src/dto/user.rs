//! Staff user DTOs

use edufund_core::models::{User, UserRole};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to create a staff user
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UserCreateRequest {
    /// Login name
    #[validate(length(min = 3, max = 50, message = "Username must be between 3 and 50 characters"))]
    pub username: String,

    /// Initial password
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    /// Display name
    #[validate(length(max = 200))]
    pub full_name: Option<String>,

    /// Contact email
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    /// Defaults to `operator`
    #[serde(default)]
    pub role: UserRole,
}

impl UserCreateRequest {
    /// User entity holding the hashed password
    pub fn to_user(&self, password_hash: String) -> User {
        User {
            username: self.username.trim().to_string(),
            password_hash,
            full_name: self.full_name.clone(),
            email: self.email.clone(),
            role: self.role,
            ..Default::default()
        }
    }
}

/// Request to update a staff user
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UserUpdateRequest {
    /// New display name
    #[validate(length(max = 200))]
    pub full_name: Option<String>,

    /// New contact email
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    /// New role
    pub role: Option<UserRole>,

    /// `false` blocks sign-in
    pub is_active: Option<bool>,

    /// Replace the password without knowing the old one
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
}

/// Staff user as shown in the user management screen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    /// User id
    pub id: i32,
    /// Login name
    pub username: String,
    /// Display name
    pub full_name: Option<String>,
    /// Contact email
    pub email: Option<String>,
    /// Role
    pub role: UserRole,
    /// Whether the user may sign in
    pub is_active: bool,
    /// Last successful sign-in
    pub last_login: Option<DateTime<Utc>>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            full_name: user.full_name,
            email: user.email,
            role: user.role,
            is_active: user.is_active,
            last_login: user.last_login,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_defaults_to_operator() {
        let req: UserCreateRequest = serde_json::from_str(
            r#"{"username":"clerk","password":"longenough","email":"clerk@moe.gov.sg"}"#,
        )
        .unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.role, UserRole::Operator);

        let user = req.to_user("hash".to_string());
        assert_eq!(user.username, "clerk");
        assert!(user.is_active);
    }

    #[test]
    fn test_create_request_rejects_bad_email() {
        let req = UserCreateRequest {
            username: "clerk".to_string(),
            password: "longenough".to_string(),
            full_name: None,
            email: Some("not-an-email".to_string()),
            role: UserRole::Admin,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_response_hides_password() {
        let user = User {
            id: 7,
            username: "ops".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_string(&UserResponse::from(user)).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"role\":\"operator\""));
    }
}
