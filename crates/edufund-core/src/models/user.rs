//! User model
//!
//! Staff users of the Admin Portal, and the role carried by every session
//! token (including e-service sessions of account holders).

use super::text_enum;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

text_enum! {
    /// Session role
    #[derive(Default)]
    pub enum UserRole {
        /// Account holder signed in to the E-Service portal
        Holder => "holder",
        /// Staff with read access and day-to-day operations
        #[default]
        Operator => "operator",
        /// Staff who may close accounts, run batches and manage rules
        Admin => "admin",
        /// Staff with system-wide access
        Superadmin => "superadmin",
    }
}

impl UserRole {
    /// Check if role belongs to Admin Portal staff
    pub fn is_staff(&self) -> bool {
        !matches!(self, UserRole::Holder)
    }

    /// Check if role has admin privileges
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Superadmin)
    }

    /// Check if role has superadmin privileges
    pub fn is_superadmin(&self) -> bool {
        matches!(self, UserRole::Superadmin)
    }

    /// Get role hierarchy level (higher = more privileges)
    pub fn level(&self) -> u8 {
        match self {
            UserRole::Holder => 0,
            UserRole::Operator => 1,
            UserRole::Admin => 2,
            UserRole::Superadmin => 3,
        }
    }

    /// Check if this role can manage another staff role
    pub fn can_manage(&self, other: &UserRole) -> bool {
        other.is_staff() && self.level() > other.level()
    }
}

/// Staff user entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i32,

    /// Username (unique, for login)
    pub username: String,

    /// Password hash (never expose in API responses)
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub full_name: Option<String>,

    pub email: Option<String>,

    pub role: UserRole,

    /// Whether user may sign in
    pub is_active: bool,

    pub last_login: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Name shown in the portal header
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.username)
    }

    /// Check if user can perform admin actions
    pub fn can_admin(&self) -> bool {
        self.is_active && self.role.is_admin()
    }

    /// Check if user is active and can login
    pub fn can_login(&self) -> bool {
        self.is_active && self.role.is_staff()
    }
}

impl Default for User {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            username: String::new(),
            password_hash: String::new(),
            full_name: None,
            email: None,
            role: UserRole::Operator,
            is_active: true,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// User info for API responses (without sensitive data)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: i32,
    pub username: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            role: user.role.to_string(),
            is_active: user.is_active,
            last_login: user.last_login,
        }
    }
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        UserInfo::from(&user)
    }
}
